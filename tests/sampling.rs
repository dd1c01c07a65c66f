extern crate fractal_sampler;
extern crate rand;

use fractal_sampler::num::Complex;
use fractal_sampler::{
    gpu_available, sample_escape_time, sample_escape_time_gpu, sample_newton, sample_newton_gpu,
    Pixel, Polynomial, RootMatcher, SampleError, SampleGrid, View, NO_ROOT,
};
use rand::Rng;

fn real(coeffs: &[f64]) -> Vec<Complex<f64>> {
    coeffs.iter().map(|&re| Complex::new(re, 0.0)).collect()
}

/// The output pixel whose point lies closest to `z`.
fn pixel_near(view: &View, z: Complex<f64>) -> Pixel {
    let grid = SampleGrid::new(view).unwrap();
    grid.pixel_of(&z).unwrap()
}

#[test]
fn worker_count_does_not_change_escape_time() {
    let view = View::new(Complex::new(-0.75, 0.1), 2.5, 2.0, 97, 61);
    let one = sample_escape_time(&view, 200, None, 1).unwrap();
    for workers in &[2, 3, 7, 61, 200, 0] {
        assert_eq!(sample_escape_time(&view, 200, None, *workers).unwrap(), one);
    }
}

#[test]
fn worker_count_does_not_change_newton() {
    let view = View::new(Complex::new(0.1, -0.2), 3.0, 3.0, 50, 37);
    let coeffs = real(&[-1.0, 0.0, 0.0, 1.0]);
    let one = sample_newton(&coeffs, &view, 60, 1).unwrap();
    for workers in &[2, 5, 37, 0] {
        assert_eq!(sample_newton(&coeffs, &view, 60, *workers).unwrap(), one);
    }
}

#[test]
fn worker_count_does_not_change_random_views() {
    let mut rng = rand::thread_rng();
    for _ in 0..8 {
        let view = View::new(
            Complex::new(rng.gen_range(-2.0, 1.0), rng.gen_range(-1.0, 1.0)),
            rng.gen_range(0.01, 3.0),
            rng.gen_range(0.01, 3.0),
            rng.gen_range(1, 40),
            rng.gen_range(1, 40),
        );
        let workers = rng.gen_range(2, 9);
        let julia_c = if rng.gen() {
            Some(Complex::new(rng.gen_range(-1.0, 1.0), rng.gen_range(-1.0, 1.0)))
        } else {
            None
        };
        assert_eq!(
            sample_escape_time(&view, 64, julia_c, 1).unwrap(),
            sample_escape_time(&view, 64, julia_c, workers).unwrap(),
            "{:?} with {} workers",
            view,
            workers
        );
    }
}

#[test]
fn origin_is_inside_the_mandelbrot_set() {
    for &(width, height) in &[(3, 3), (31, 17), (200, 150)] {
        let view = View::new(Complex::new(-0.5, 0.0), 3.0, 3.0, width, height);
        let sample = sample_escape_time(&view, 100, None, 4).unwrap();
        let pixel = pixel_near(&view, Complex::new(0.0, 0.0));
        assert_eq!(sample.iterations().get(pixel), Some(&100));
        assert_eq!(sample.limit(), 100);
    }
}

#[test]
fn far_outside_escapes_at_once() {
    let view = View::new(Complex::new(2.0, 2.0), 0.5, 0.5, 1, 1);
    let sample = sample_escape_time(&view, 100, None, 1).unwrap();
    assert_eq!(sample.iterations().as_slice(), &[1]);
}

#[test]
fn newton_basins_of_z_squared_minus_one() {
    let view = View::new(Complex::new(0.0, 0.0), 4.0, 4.0, 41, 41);
    let sample = sample_newton(&real(&[-1.0, 0.0, 1.0]), &view, 50, 0).unwrap();
    let roots = sample.roots();
    assert_eq!(roots.len(), 2);
    assert!((roots[0] - Complex::new(-1.0, 0.0)).norm() < 1e-9);
    assert!((roots[1] - Complex::new(1.0, 0.0)).norm() < 1e-9);

    let right = pixel_near(&view, Complex::new(1.0, 0.0));
    let left = pixel_near(&view, Complex::new(-1.0, 0.0));
    let saddle = pixel_near(&view, Complex::new(0.0, 0.0));
    assert_eq!(sample.root_index().get(right), Some(&1));
    assert_eq!(sample.root_index().get(left), Some(&0));
    let unresolved = sample.root_index().get(saddle) == Some(&NO_ROOT)
        || sample.iterations().get(saddle) == Some(&sample.limit());
    assert!(unresolved);
}

/// Every pixel of a sample whose only root is repeated must converge
/// onto that root.
fn assert_all_matched_to_repeated_root(coeffs: &[Complex<f64>], view: &View, root: Complex<f64>) {
    let sample = sample_newton(coeffs, view, 200, 0).unwrap();
    let roots = sample.roots();
    assert_eq!(roots.len(), 3);
    assert_eq!(roots.multiplicity(0), 3);
    for r in roots.iter() {
        assert!((r - root).norm() < 1e-9, "{} is not {}", r, root);
    }
    for (&index, &itr) in sample
        .root_index()
        .as_slice()
        .iter()
        .zip(sample.iterations().as_slice())
    {
        assert!(itr < sample.limit());
        assert_eq!(index, 0);
    }
}

#[test]
fn triple_roots_claim_every_converged_pixel() {
    let view = View::new(Complex::new(1.0, 0.0), 4.0, 4.0, 33, 33);
    assert_all_matched_to_repeated_root(&real(&[-1.0, 3.0, -3.0, 1.0]), &view, Complex::new(1.0, 0.0));

    let view = View::new(Complex::new(0.0, 0.0), 4.0, 4.0, 33, 33);
    assert_all_matched_to_repeated_root(&real(&[0.0, 0.0, 0.0, 1.0]), &view, Complex::new(0.0, 0.0));
}

#[test]
fn roots_far_from_the_origin_get_their_basins() {
    let root = 937.3f64.sqrt();
    let view = View::new(Complex::new(0.0, 0.0), 80.0, 80.0, 41, 41);
    let sample = sample_newton(&real(&[-937.3, 0.0, 1.0]), &view, 100, 0).unwrap();
    let roots = sample.roots();
    assert_eq!(roots.len(), 2);
    assert!((roots[0] + root).norm() < 1e-9);
    assert!((roots[1] - root).norm() < 1e-9);

    let right = pixel_near(&view, Complex::new(root, 0.0));
    let left = pixel_near(&view, Complex::new(-root, 0.0));
    let far_right = pixel_near(&view, Complex::new(38.0, 25.0));
    assert_eq!(sample.root_index().get(right), Some(&1));
    assert_eq!(sample.root_index().get(left), Some(&0));
    assert_eq!(sample.root_index().get(far_right), Some(&1));
}

#[test]
fn unconverged_pixels_are_never_matched() {
    // z^2 + 1 on the real line: real starts never leave it.
    let view = View::new(Complex::new(0.0, 0.0), 4.0, 1.0, 33, 1);
    let sample = sample_newton(&real(&[1.0, 0.0, 1.0]), &view, 30, 2).unwrap();
    for (&index, &itr) in sample
        .root_index()
        .as_slice()
        .iter()
        .zip(sample.iterations().as_slice())
    {
        assert_eq!(itr, 30);
        assert_eq!(index, NO_ROOT);
    }
}

#[test]
fn top_left_pixel_is_start_re_end_im() {
    let view = View::new(Complex::new(1.0, -2.0), 4.0, 2.0, 9, 5);
    let grid = SampleGrid::new(&view).unwrap();
    let corner = grid.image_point(Pixel { row: 0, col: 0 });
    assert_eq!(corner, Complex::new(grid.start.re, grid.end.im));
    assert_eq!(corner, Complex::new(-1.0, -1.0));

    let (x_span, y_span) = grid.span();
    assert!((grid.center() - view.center).norm() < 1e-12);
    assert!((x_span - view.x_span).abs() < 1e-12);
    assert!((y_span - view.y_span).abs() < 1e-12);
}

#[test]
fn mapping_round_trips_random_pixels() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let view = View::new(
            Complex::new(rng.gen_range(-5.0, 5.0), rng.gen_range(-5.0, 5.0)),
            rng.gen_range(0.001, 10.0),
            rng.gen_range(0.001, 10.0),
            rng.gen_range(2, 500),
            rng.gen_range(2, 500),
        );
        let grid = SampleGrid::new(&view).unwrap();
        let pixel = Pixel {
            row: rng.gen_range(0, view.y_resolution),
            col: rng.gen_range(0, view.x_resolution),
        };
        assert_eq!(grid.pixel_of(&grid.image_point(pixel)), Some(pixel));
    }
}

#[test]
fn matching_a_true_root_is_idempotent() {
    let poly = Polynomial::from_real(&[6.0, -5.0, -2.0, 1.0]).unwrap();
    let roots = poly.roots();
    let matcher = RootMatcher::new(&roots);
    for (index, root) in roots.iter().enumerate() {
        assert_eq!(roots.nearest(*root), Some((index, 0.0)));
        assert_eq!(matcher.match_root(*root), Some(index));
    }
}

#[test]
fn invalid_input_is_rejected_before_sampling() {
    let good = View::new(Complex::new(0.0, 0.0), 2.0, 2.0, 8, 8);
    let flat = View::new(Complex::new(0.0, 0.0), 2.0, 0.0, 8, 8);
    let empty = View::new(Complex::new(0.0, 0.0), 2.0, 2.0, 8, 0);

    match sample_escape_time(&flat, 10, None, 1) {
        Err(SampleError::InvalidGrid(_)) => (),
        other => panic!("expected InvalidGrid, got {:?}", other),
    }
    match sample_escape_time(&empty, 10, None, 1) {
        Err(SampleError::InvalidGrid(_)) => (),
        other => panic!("expected InvalidGrid, got {:?}", other),
    }
    match sample_escape_time(&good, 0, None, 1) {
        Err(SampleError::InvalidIterationBound(0)) => (),
        other => panic!("expected InvalidIterationBound, got {:?}", other),
    }
    match sample_newton(&real(&[3.0]), &good, 10, 1) {
        Err(SampleError::InvalidPolynomial(_)) => (),
        other => panic!("expected InvalidPolynomial, got {:?}", other),
    }
    match sample_newton(&real(&[3.0, 1.0, 0.0]), &good, 10, 1) {
        Err(SampleError::InvalidPolynomial(_)) => (),
        other => panic!("expected InvalidPolynomial, got {:?}", other),
    }
}

#[test]
fn gpu_path_matches_cpu_or_reports_unavailable() {
    let view = View::new(Complex::new(-0.5, 0.0), 3.0, 3.0, 48, 32);
    let cpu = sample_escape_time(&view, 80, None, 0).unwrap();
    match sample_escape_time_gpu(&view, 80, None) {
        Ok(gpu) => {
            assert!(gpu_available());
            assert_eq!(gpu.iterations().width(), cpu.iterations().width());
            assert_eq!(gpu.iterations().height(), cpu.iterations().height());
            let inside = pixel_near(&view, Complex::new(-0.1, 0.0));
            let outside = pixel_near(&view, Complex::new(-2.0, 1.5));
            assert_eq!(gpu.iterations().get(inside), cpu.iterations().get(inside));
            assert_eq!(gpu.iterations().get(outside), cpu.iterations().get(outside));
        }
        Err(SampleError::AcceleratorUnavailable(_)) => assert!(!gpu_available()),
        Err(e) => panic!("unexpected error: {}", e),
    }

    let coeffs = real(&[-1.0, 0.0, 1.0]);
    let view = View::new(Complex::new(0.0, 0.0), 4.0, 4.0, 21, 21);
    let cpu = sample_newton(&coeffs, &view, 50, 0).unwrap();
    match sample_newton_gpu(&coeffs, &view, 50) {
        Ok(gpu) => {
            assert_eq!(gpu.roots(), cpu.roots());
            let right = pixel_near(&view, Complex::new(1.4, 0.0));
            assert_eq!(gpu.root_index().get(right), Some(&1));
        }
        Err(e) => assert!(e.is_recoverable()),
    }

    let coeffs = real(&[-937.3, 0.0, 1.0]);
    let view = View::new(Complex::new(0.0, 0.0), 80.0, 80.0, 41, 41);
    match sample_newton_gpu(&coeffs, &view, 100) {
        Ok(gpu) => {
            let right = pixel_near(&view, Complex::new(36.0, 4.0));
            let left = pixel_near(&view, Complex::new(-36.0, -4.0));
            assert_eq!(gpu.root_index().get(right), Some(&1));
            assert_eq!(gpu.root_index().get(left), Some(&0));
        }
        Err(e) => assert!(e.is_recoverable()),
    }
}
