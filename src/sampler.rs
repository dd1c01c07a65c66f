// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The sampling calls a renderer makes.  Each call validates all of its
//! input, runs one strategy over the whole grid, and returns a
//! finished, row-flipped snapshot that it never touches again.

use itertools::Itertools;
use num::Complex;
use std::time::Instant;

use accelerator::{Accelerator, SampleConfig};
use errors::SampleError;
use escape::{EscapeTime, EscapeTimeSampler};
use gpu;
use grid::{Grid, SampleGrid, View};
use newton::{NewtonPixel, NewtonSampler};
use polynomial::Polynomial;
use roots::{RootMatcher, RootSet};
use threads::render;

/// An escape-time sample.
#[derive(Clone, Debug, PartialEq)]
pub struct EscapeTimeSample {
    iterations: Grid<u32>,
    limit: u32,
    kind: EscapeTime,
}

impl EscapeTimeSample {
    /// Steps to escape for each pixel, with row 0 at the top.
    pub fn iterations(&self) -> &Grid<u32> {
        &self.iterations
    }

    /// The sentinel: a pixel holding this never escaped.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Mandelbrot or Julia.
    pub fn kind(&self) -> EscapeTime {
        self.kind
    }

    /// The iteration grid and the sentinel.
    pub fn into_parts(self) -> (Grid<u32>, u32) {
        (self.iterations, self.limit)
    }
}

/// A Newton sample.  All three grids share one shape, with row 0 at
/// the top.
#[derive(Clone, Debug, PartialEq)]
pub struct NewtonSample {
    approx_roots: Grid<Complex<f64>>,
    root_index: Grid<i32>,
    iterations: Grid<u32>,
    limit: u32,
    roots: RootSet,
}

impl NewtonSample {
    /// Where each pixel's iteration stopped.
    pub fn approx_roots(&self) -> &Grid<Complex<f64>> {
        &self.approx_roots
    }

    /// Index into `roots()` for each pixel, or `NO_ROOT`.
    pub fn root_index(&self) -> &Grid<i32> {
        &self.root_index
    }

    /// Steps taken by each pixel.
    pub fn iterations(&self) -> &Grid<u32> {
        &self.iterations
    }

    /// The sentinel: a pixel holding this never converged.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The true roots, in the order `root_index` refers to.
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    /// Approximate roots, root indices, iterations, and the sentinel.
    pub fn into_parts(self) -> (Grid<Complex<f64>>, Grid<i32>, Grid<u32>, u32) {
        (self.approx_roots, self.root_index, self.iterations, self.limit)
    }
}

/// True if the GPU strategy can run on this machine.
pub fn gpu_available() -> bool {
    gpu::usable()
}

/// Samples the Mandelbrot set, or the Julia set for `julia_c`, on the
/// CPU with `workers` threads (zero for one per CPU).
pub fn sample_escape_time(
    view: &View,
    max_itr: u32,
    julia_c: Option<Complex<f64>>,
    workers: usize,
) -> Result<EscapeTimeSample, SampleError> {
    sample_escape_time_with(view, max_itr, julia_c, &SampleConfig::cpu(workers))
}

/// As `sample_escape_time`, on the GPU.
pub fn sample_escape_time_gpu(
    view: &View,
    max_itr: u32,
    julia_c: Option<Complex<f64>>,
) -> Result<EscapeTimeSample, SampleError> {
    sample_escape_time_with(view, max_itr, julia_c, &SampleConfig::gpu())
}

/// Escape-time sampling under an explicit configuration.
pub fn sample_escape_time_with(
    view: &View,
    max_itr: u32,
    julia_c: Option<Complex<f64>>,
    config: &SampleConfig,
) -> Result<EscapeTimeSample, SampleError> {
    let grid = SampleGrid::new(view)?;
    let kind = EscapeTime::from_julia_constant(julia_c);
    let sampler = EscapeTimeSampler::new(kind, max_itr)?;

    info!(
        "Processing {} points ({:?}, {} iterations, {:?})",
        grid.len(),
        kind,
        max_itr,
        config.accelerator
    );
    let began = Instant::now();

    let cells = match config.accelerator {
        Accelerator::Cpu { workers } => render(&grid, &sampler, workers),
        Accelerator::Gpu => gpu::Device::acquire()?.escape_time(&grid, &sampler)?,
    };

    info!("Time taken: {:?}", began.elapsed());
    Ok(EscapeTimeSample {
        iterations: Grid::from_computed(grid.x_resolution, grid.y_resolution, cells),
        limit: sampler.max_itr(),
        kind,
    })
}

/// Samples Newton's method for the polynomial with `coeffs` (lowest
/// degree first) on the CPU with `workers` threads, then matches each
/// pixel to a true root.
pub fn sample_newton(
    coeffs: &[Complex<f64>],
    view: &View,
    max_itr: u32,
    workers: usize,
) -> Result<NewtonSample, SampleError> {
    sample_newton_with(coeffs, view, max_itr, &SampleConfig::cpu(workers))
}

/// As `sample_newton`, on the GPU.  Root matching still runs on the
/// host.
pub fn sample_newton_gpu(
    coeffs: &[Complex<f64>],
    view: &View,
    max_itr: u32,
) -> Result<NewtonSample, SampleError> {
    sample_newton_with(coeffs, view, max_itr, &SampleConfig::gpu())
}

/// Newton sampling under an explicit configuration.
pub fn sample_newton_with(
    coeffs: &[Complex<f64>],
    view: &View,
    max_itr: u32,
    config: &SampleConfig,
) -> Result<NewtonSample, SampleError> {
    let grid = SampleGrid::new(view)?;
    let poly = Polynomial::new(coeffs.to_vec())?;
    let sampler = NewtonSampler::new(poly, max_itr)?;

    // The roots depend on the coefficients alone.
    let roots = sampler.polynomial().roots();
    debug!(
        "roots of degree {} polynomial: [{}]",
        roots.len(),
        roots.iter().join(", ")
    );

    info!(
        "Processing {} points (Newton, degree {}, {} iterations, {:?})",
        grid.len(),
        roots.len(),
        max_itr,
        config.accelerator
    );
    let began = Instant::now();

    let (pixels, workers) = match config.accelerator {
        Accelerator::Cpu { workers } => (render(&grid, &sampler, workers), workers),
        Accelerator::Gpu => (gpu::Device::acquire()?.newton(&grid, &sampler)?, 0),
    };

    let (approx, iterations): (Vec<Complex<f64>>, Vec<u32>) = pixels
        .iter()
        .map(|&NewtonPixel { approx_root, iterations }| (approx_root, iterations))
        .unzip();
    let matcher = RootMatcher::for_residual(&roots, sampler.polynomial(), sampler.tolerance());
    let root_index = matcher.assign(
        &approx,
        &iterations,
        sampler.max_itr(),
        grid.x_resolution,
        workers,
    );

    info!("Time taken: {:?}", began.elapsed());
    let (width, height) = (grid.x_resolution, grid.y_resolution);
    Ok(NewtonSample {
        approx_roots: Grid::from_computed(width, height, approx),
        root_index: Grid::from_computed(width, height, root_index),
        iterations: Grid::from_computed(width, height, iterations),
        limit: sampler.max_itr(),
        roots,
    })
}
