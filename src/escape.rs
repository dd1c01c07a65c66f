//! Escape-time sampling of the quadratic family `z -> z^2 + c`.
//!
//! For the Mandelbrot set the sampled point is `c` and the orbit starts
//! at zero; for a Julia set `c` is fixed and the orbit starts at the
//! sampled point.  Either way the answer for a pixel is how many steps
//! the orbit took to leave the disc of radius `ESCAPE_RADIUS`, or the
//! iteration cap if it never did.

use num::Complex;

use errors::{check_iteration_bound, SampleError};
use threads::PixelKernel;

/// Any orbit of `z^2 + c` that leaves this disc diverges.  It is not a
/// tuning knob.
pub const ESCAPE_RADIUS: f64 = 2.0;

const ESCAPE_RADIUS_SQR: f64 = ESCAPE_RADIUS * ESCAPE_RADIUS;

/// Which member of the family to sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EscapeTime {
    /// `c` is the sampled point, `z0 = 0`.
    Mandelbrot,
    /// `c` is fixed, `z0` is the sampled point.
    Julia(Complex<f64>),
}

impl EscapeTime {
    /// Mandelbrot when no constant is given, Julia otherwise.
    pub fn from_julia_constant(julia_c: Option<Complex<f64>>) -> EscapeTime {
        match julia_c {
            Some(c) => EscapeTime::Julia(c),
            None => EscapeTime::Mandelbrot,
        }
    }
}

/// This is our classic iterator function.  It returns the number of
/// steps it took for the orbit of `z` under `z^2 + c` to escape, or
/// `max_itr` if it never did.  An orbit that escapes on exactly the
/// last step is indistinguishable from one that never escapes.
#[inline]
pub fn escape_iterations(mut z: Complex<f64>, c: Complex<f64>, max_itr: u32) -> u32 {
    let mut itr = 0;
    while itr < max_itr {
        z = z * z + c;
        itr += 1;
        if z.norm_sqr() > ESCAPE_RADIUS_SQR {
            return itr;
        }
    }
    max_itr
}

/// Per-pixel escape-time kernel.
#[derive(Copy, Clone, Debug)]
pub struct EscapeTimeSampler {
    kind: EscapeTime,
    max_itr: u32,
}

impl EscapeTimeSampler {
    /// Refuses an iteration cap of zero.
    pub fn new(kind: EscapeTime, max_itr: u32) -> Result<EscapeTimeSampler, SampleError> {
        Ok(EscapeTimeSampler {
            kind,
            max_itr: check_iteration_bound(max_itr)?,
        })
    }

    /// The member of the family being sampled.
    pub fn kind(&self) -> EscapeTime {
        self.kind
    }

    /// The iteration cap, which doubles as the "did not escape"
    /// sentinel.
    pub fn max_itr(&self) -> u32 {
        self.max_itr
    }
}

impl PixelKernel for EscapeTimeSampler {
    type Output = u32;

    #[inline]
    fn sample(&self, point: Complex<f64>) -> u32 {
        match self.kind {
            EscapeTime::Mandelbrot => {
                escape_iterations(Complex::new(0.0, 0.0), point, self.max_itr)
            }
            EscapeTime::Julia(c) => escape_iterations(point, c, self.max_itr),
        }
    }
}
