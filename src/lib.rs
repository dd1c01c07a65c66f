#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fractal sampler
//!
//! Escape-time fractals (the Mandelbrot set and its Julia sets) and
//! Newton fractals are both pictures of an iteration.  Every pixel of
//! the image stands for one point on the complex plane; we iterate a
//! function starting from (or parameterised by) that point and record
//! what happened.  For the Mandelbrot and Julia sets that is how long
//! the orbit took to run away to infinity.  For Newton's method on a
//! polynomial it is which root the orbit settled on, and how quickly.
//!
//! Every pixel is independent of every other, so a grid can be cut up
//! any way we like.  The CPU strategy hands bands of rows to scoped
//! worker threads; the GPU strategy (behind the `gpu` feature) runs one
//! shader invocation per pixel.  Either way the caller gets back a
//! complete grid with row 0 at the top of the image, or an error and no
//! grid at all.
//!
//! ```
//! use fractal_sampler::{sample_escape_time, View};
//! use fractal_sampler::num::Complex;
//!
//! let view = View::new(Complex::new(-0.5, 0.0), 3.0, 3.0, 64, 48);
//! let sample = sample_escape_time(&view, 100, None, 0).unwrap();
//! assert_eq!(sample.iterations().width(), 64);
//! ```

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate itertools;
#[macro_use]
extern crate log;
pub extern crate num;
extern crate num_cpus;

#[cfg(feature = "gpu")]
extern crate bytemuck;
#[cfg(feature = "gpu")]
extern crate pollster;
#[cfg(feature = "gpu")]
extern crate wgpu;

pub mod accelerator;
pub mod errors;
pub mod escape;
pub mod gpu;
pub mod grid;
pub mod newton;
pub mod polynomial;
pub mod roots;
pub mod sampler;
pub mod threads;

pub use accelerator::{Accelerator, Capabilities, SampleConfig};
pub use errors::SampleError;
pub use escape::{EscapeTime, EscapeTimeSampler, ESCAPE_RADIUS};
pub use grid::{Grid, Pixel, SampleGrid, View};
pub use newton::{NewtonPixel, NewtonSampler, NEWTON_TOLERANCE};
pub use polynomial::Polynomial;
pub use roots::{RootMatcher, RootSet, NO_ROOT, ROOT_MATCH_TOLERANCE};
pub use sampler::{
    gpu_available, sample_escape_time, sample_escape_time_gpu, sample_escape_time_with,
    sample_newton, sample_newton_gpu, sample_newton_with, EscapeTimeSample, NewtonSample,
};
