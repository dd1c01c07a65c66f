//! Contains the SampleGrid, which describes a relationship between a
//! rectangle of pixels and a rectangle on the complex plane, and the
//! Grid container in which every sampler hands its results back.
//!
//! Samplers compute row 0 at the lowest imaginary value.  Output grids
//! are flipped before they are returned, so row 0 of a `Grid` is the
//! top of an image: the highest imaginary value.
use num::Complex;
use std::slice::Chunks;

use errors::SampleError;

/// What the caller asks to see: a center on the complex plane, the
/// extent of the region along each axis, and how many samples to take
/// along each axis.  Half of each span lies on either side of the
/// center.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct View {
    /// The middle of the sampled region.
    pub center: Complex<f64>,
    /// Width of the region along the real axis.
    pub x_span: f64,
    /// Height of the region along the imaginary axis.
    pub y_span: f64,
    /// Number of samples along the real axis.
    pub x_resolution: usize,
    /// Number of samples along the imaginary axis.
    pub y_resolution: usize,
}

impl View {
    /// Convenience constructor.
    pub fn new(
        center: Complex<f64>,
        x_span: f64,
        y_span: f64,
        x_resolution: usize,
        y_resolution: usize,
    ) -> View {
        View {
            center,
            x_span,
            y_span,
            x_resolution,
            y_resolution,
        }
    }
}

/// A position in an output grid.  Row 0 is the top of the image.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pixel {
    /// Counted down from the top.
    pub row: usize,
    /// Counted right from the left edge.
    pub col: usize,
}

/// A validated View.  The bounds run from `start` (left-lower) to
/// `end` (right-upper) and both corners are sampled; an axis with a
/// single sample takes it at the center.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleGrid {
    /// Samples along the real axis.
    pub x_resolution: usize,
    /// Samples along the imaginary axis.
    pub y_resolution: usize,
    /// The left-lower corner.
    pub start: Complex<f64>,
    /// The right-upper corner.
    pub end: Complex<f64>,
    origin: Complex<f64>,
    step: (f64, f64),
}

fn axis_origin(start: f64, end: f64, resolution: usize) -> f64 {
    if resolution == 1 {
        start + (end - start) / 2.0
    } else {
        start
    }
}

fn axis_step(start: f64, end: f64, resolution: usize) -> f64 {
    if resolution == 1 {
        0.0
    } else {
        (end - start) / ((resolution - 1) as f64)
    }
}

// A one-sample axis owns the whole of [start, end].
fn axis_index(value: f64, bounds: (f64, f64), origin: f64, step: f64, resolution: usize) -> Option<usize> {
    if step == 0.0 {
        return if value >= bounds.0 && value <= bounds.1 {
            Some(0)
        } else {
            None
        };
    }
    let index = ((value - origin) / step).round();
    if !(index >= 0.0 && index < resolution as f64) {
        return None;
    }
    Some(index as usize)
}

impl SampleGrid {
    /// Validates a View and derives its bounds.  Nothing is sampled
    /// for a view this refuses.
    pub fn new(view: &View) -> Result<SampleGrid, SampleError> {
        if view.x_resolution == 0 || view.y_resolution == 0 {
            return Err(SampleError::InvalidGrid(format!(
                "resolution must be at least 1 on both axes, got {}x{}",
                view.x_resolution, view.y_resolution
            )));
        }

        if !view.center.re.is_finite() || !view.center.im.is_finite() {
            return Err(SampleError::InvalidGrid(format!(
                "center {} is not finite",
                view.center
            )));
        }

        if !view.x_span.is_finite() || !view.y_span.is_finite() {
            return Err(SampleError::InvalidGrid(format!(
                "spans {} and {} must be finite",
                view.x_span, view.y_span
            )));
        }

        let half = Complex::new(view.x_span / 2.0, view.y_span / 2.0);
        let start = view.center - half;
        let end = view.center + half;

        // A span can be non-zero and still vanish against a large center.
        if start.re == end.re || start.im == end.im {
            return Err(SampleError::InvalidGrid(format!(
                "bounds {} and {} do not enclose an area",
                start, end
            )));
        }

        Ok(SampleGrid {
            x_resolution: view.x_resolution,
            y_resolution: view.y_resolution,
            start,
            end,
            origin: Complex::new(
                axis_origin(start.re, end.re, view.x_resolution),
                axis_origin(start.im, end.im, view.y_resolution),
            ),
            step: (
                axis_step(start.re, end.re, view.x_resolution),
                axis_step(start.im, end.im, view.y_resolution),
            ),
        })
    }

    /// The total number of samples in the grid.
    pub fn len(&self) -> usize {
        self.x_resolution * self.y_resolution
    }

    /// A validated grid always holds at least one sample.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The complex value sampled by the first pixel computed, the one
    /// nearest `start`.
    pub fn origin(&self) -> Complex<f64> {
        self.origin
    }

    /// Distance between neighbouring samples along each axis.
    pub fn step(&self) -> (f64, f64) {
        self.step
    }

    /// The point sampled at a row and column in computation order,
    /// where row 0 lies on `start.im`.
    #[inline]
    pub fn point(&self, row: usize, col: usize) -> Complex<f64> {
        Complex::new(
            self.origin.re + (col as f64) * self.step.0,
            self.origin.im + (row as f64) * self.step.1,
        )
    }

    /// The point shown at a pixel of a returned (flipped) grid.
    pub fn image_point(&self, pixel: Pixel) -> Complex<f64> {
        self.point(self.y_resolution - 1 - pixel.row, pixel.col)
    }

    /// Given a complex number, find the output pixel whose sample lies
    /// nearest to it, or None if it falls outside the grid.
    pub fn pixel_of(&self, point: &Complex<f64>) -> Option<Pixel> {
        let col = axis_index(
            point.re,
            (self.start.re, self.end.re),
            self.origin.re,
            self.step.0,
            self.x_resolution,
        )?;
        let row = axis_index(
            point.im,
            (self.start.im, self.end.im),
            self.origin.im,
            self.step.1,
            self.y_resolution,
        )?;
        Some(Pixel {
            row: self.y_resolution - 1 - row,
            col,
        })
    }

    /// The center recovered from the bounds.
    pub fn center(&self) -> Complex<f64> {
        (self.start + self.end) / 2.0
    }

    /// The spans recovered from the bounds.
    pub fn span(&self) -> (f64, f64) {
        (self.end.re - self.start.re, self.end.im - self.start.im)
    }
}

/// Swaps rows top-for-bottom in a row-major buffer.
fn flip_rows<T>(cells: &mut [T], width: usize) {
    let height = cells.len() / width;
    for row in 0..height / 2 {
        let (top, bottom) = cells.split_at_mut((height - 1 - row) * width);
        top[row * width..(row + 1) * width].swap_with_slice(&mut bottom[..width]);
    }
}

/// A fixed-shape, row-major grid of per-pixel results with row 0 at
/// the top of the image.  Once a sampler returns one, it is never
/// written to again.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Takes a buffer laid out in computation order and flips it into
    /// image order.
    pub(crate) fn from_computed(width: usize, height: usize, mut cells: Vec<T>) -> Grid<T> {
        debug_assert_eq!(cells.len(), width * height);
        flip_rows(&mut cells, width);
        Grid {
            width,
            height,
            cells,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The cell at a pixel, if it lies inside the grid.
    pub fn get(&self, pixel: Pixel) -> Option<&T> {
        if pixel.row >= self.height || pixel.col >= self.width {
            return None;
        }
        self.cells.get(pixel.row * self.width + pixel.col)
    }

    /// Rows from the top of the image down.
    pub fn rows(&self) -> Chunks<T> {
        self.cells.chunks(self.width)
    }

    /// All cells, row-major from the top left.
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// Gives up the grid's shape and returns the cells.
    pub fn into_vec(self) -> Vec<T> {
        self.cells
    }

    /// A grid of the same shape with `f` applied to every cell.
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(center: Complex<f64>, span: f64, resolution: usize) -> View {
        View::new(center, span, span, resolution, resolution)
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let v = View::new(Complex::new(0.0, 0.0), 2.0, 2.0, 0, 4);
        match SampleGrid::new(&v) {
            Err(SampleError::InvalidGrid(_)) => (),
            other => panic!("expected InvalidGrid, got {:?}", other),
        }
    }

    #[test]
    fn zero_span_is_rejected() {
        let v = View::new(Complex::new(0.0, 0.0), 2.0, 0.0, 4, 4);
        assert!(SampleGrid::new(&v).is_err());
    }

    #[test]
    fn vanishing_span_against_large_center_is_rejected() {
        let v = View::new(Complex::new(1.0e20, 0.0), 1.0e-10, 1.0, 4, 4);
        assert!(SampleGrid::new(&v).is_err());
    }

    #[test]
    fn non_finite_center_is_rejected() {
        let v = View::new(Complex::new(std::f64::NAN, 0.0), 2.0, 2.0, 4, 4);
        assert!(SampleGrid::new(&v).is_err());
    }

    #[test]
    fn bounds_are_center_plus_and_minus_half_span() {
        let g = SampleGrid::new(&View::new(Complex::new(-0.5, 0.25), 3.0, 2.0, 7, 5)).unwrap();
        assert_eq!(g.start, Complex::new(-2.0, -0.75));
        assert_eq!(g.end, Complex::new(1.0, 1.25));
    }

    #[test]
    fn corners_are_sampled_in_computation_order() {
        let g = SampleGrid::new(&view(Complex::new(0.0, 0.0), 4.0, 5)).unwrap();
        assert_eq!(g.point(0, 0), Complex::new(-2.0, -2.0));
        assert_eq!(g.point(4, 4), Complex::new(2.0, 2.0));
        assert_eq!(g.point(2, 2), Complex::new(0.0, 0.0));
        assert_eq!(g.point(1, 3), Complex::new(1.0, -1.0));
    }

    #[test]
    fn image_top_left_is_start_re_and_end_im() {
        let g = SampleGrid::new(&View::new(Complex::new(1.0, -1.0), 2.0, 6.0, 3, 4)).unwrap();
        assert_eq!(
            g.image_point(Pixel { row: 0, col: 0 }),
            Complex::new(g.start.re, g.end.im)
        );
        assert_eq!(
            g.image_point(Pixel { row: 3, col: 2 }),
            Complex::new(g.end.re, g.start.im)
        );
    }

    #[test]
    fn center_and_span_survive_the_mapping() {
        let center = Complex::new(-0.743643887037151, 0.13182590420533);
        let g = SampleGrid::new(&View::new(center, 0.0015, 0.001, 640, 480)).unwrap();
        let (x_span, y_span) = g.span();
        assert!((g.center() - center).norm() < 1e-12);
        assert!((x_span - 0.0015).abs() < 1e-12);
        assert!((y_span - 0.001).abs() < 1e-12);
    }

    #[test]
    fn pixel_of_inverts_image_point() {
        let g = SampleGrid::new(&View::new(Complex::new(-0.5, 0.0), 3.0, 3.0, 17, 11)).unwrap();
        for row in 0..11 {
            for col in 0..17 {
                let p = Pixel { row, col };
                assert_eq!(g.pixel_of(&g.image_point(p)), Some(p));
            }
        }
    }

    #[test]
    fn pixel_of_rejects_points_outside() {
        let g = SampleGrid::new(&view(Complex::new(0.0, 0.0), 2.0, 5)).unwrap();
        assert_eq!(g.pixel_of(&Complex::new(3.0, 0.0)), None);
        assert_eq!(g.pixel_of(&Complex::new(0.0, -3.0)), None);
    }

    #[test]
    fn single_sample_axis_sits_at_center() {
        let g = SampleGrid::new(&View::new(Complex::new(0.5, 0.25), 2.0, 2.0, 1, 1)).unwrap();
        assert_eq!(g.point(0, 0), Complex::new(0.5, 0.25));
        assert_eq!(g.len(), 1);
        assert!(!g.is_empty());
    }

    #[test]
    fn single_sample_axis_still_rejects_points_outside() {
        let g = SampleGrid::new(&View::new(Complex::new(0.0, 0.0), 2.0, 2.0, 5, 1)).unwrap();
        assert_eq!(g.pixel_of(&Complex::new(0.5, 0.0)), Some(Pixel { row: 0, col: 3 }));
        assert_eq!(g.pixel_of(&Complex::new(0.5, 0.9)), Some(Pixel { row: 0, col: 3 }));
        assert_eq!(g.pixel_of(&Complex::new(0.0, 1.0e6)), None);
        assert_eq!(g.pixel_of(&Complex::new(0.0, -1.5)), None);

        let g = SampleGrid::new(&View::new(Complex::new(0.0, 0.0), 2.0, 2.0, 1, 1)).unwrap();
        assert_eq!(g.pixel_of(&Complex::new(1.0e6, 0.0)), None);
        assert_eq!(g.pixel_of(&Complex::new(-0.25, 0.75)), Some(Pixel { row: 0, col: 0 }));
    }

    #[test]
    fn grid_flips_rows_into_image_order() {
        let grid = Grid::from_computed(2, 3, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(grid.as_slice(), &[5, 6, 3, 4, 1, 2]);
        assert_eq!(grid.get(Pixel { row: 0, col: 1 }), Some(&6));
        assert_eq!(grid.get(Pixel { row: 3, col: 0 }), None);
        let rows: Vec<&[i32]> = grid.rows().collect();
        assert_eq!(rows, vec![&[5, 6][..], &[3, 4][..], &[1, 2][..]]);
    }

    #[test]
    fn grid_flip_handles_even_heights() {
        let grid = Grid::from_computed(1, 4, vec![1, 2, 3, 4]);
        assert_eq!(grid.into_vec(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn grid_map_keeps_shape() {
        let grid = Grid::from_computed(2, 2, vec![1, 2, 3, 4]).map(|v| v * 10);
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.as_slice(), &[30, 40, 10, 20]);
    }
}
