//! Newton-Raphson sampling.  Each pixel's point is the starting guess;
//! the pixel records where the iteration settled and how many steps it
//! took.  A pixel that never settles, or that lands where the
//! derivative vanishes, is recorded with the iteration cap as its count
//! and its last iterate as its root; it does not stop the grid.

use num::Complex;

use errors::{check_iteration_bound, SampleError};
use polynomial::{Derivative, Polynomial};
use threads::PixelKernel;

/// The iteration stops once `|p(z)|` falls below this.
pub const NEWTON_TOLERANCE: f64 = 1e-6;

/// One pixel of a Newton sample.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct NewtonPixel {
    /// Where the iteration stopped.
    pub approx_root: Complex<f64>,
    /// Steps taken, or the iteration cap if it never converged.
    pub iterations: u32,
}

#[inline]
fn is_finite(z: Complex<f64>) -> bool {
    z.re.is_finite() && z.im.is_finite()
}

/// Runs Newton's method for `poly` from `z`.  `derivative` must be the
/// derivative of `poly`; it is passed in so it is built once per grid
/// rather than once per pixel.
pub fn newton_root(
    poly: &Polynomial,
    derivative: &Derivative,
    mut z: Complex<f64>,
    max_itr: u32,
    tolerance: f64,
) -> NewtonPixel {
    let mut itr = 0;
    loop {
        let value = poly.eval(z);
        if value.norm() < tolerance {
            return NewtonPixel {
                approx_root: z,
                iterations: itr,
            };
        }
        if itr == max_itr {
            break;
        }

        let slope = derivative.eval(z);
        if slope == Complex::new(0.0, 0.0) {
            break;
        }
        let next = z - value / slope;
        if !is_finite(next) {
            break;
        }
        z = next;
        itr += 1;
    }

    NewtonPixel {
        approx_root: z,
        iterations: max_itr,
    }
}

/// Per-pixel Newton kernel for one polynomial.
#[derive(Clone, Debug)]
pub struct NewtonSampler {
    poly: Polynomial,
    derivative: Derivative,
    max_itr: u32,
    tolerance: f64,
}

impl NewtonSampler {
    /// Converges within `NEWTON_TOLERANCE`.
    pub fn new(poly: Polynomial, max_itr: u32) -> Result<NewtonSampler, SampleError> {
        NewtonSampler::with_tolerance(poly, max_itr, NEWTON_TOLERANCE)
    }

    /// Converges within a caller-chosen residual.
    pub fn with_tolerance(
        poly: Polynomial,
        max_itr: u32,
        tolerance: f64,
    ) -> Result<NewtonSampler, SampleError> {
        let max_itr = check_iteration_bound(max_itr)?;
        let derivative = poly.derivative();
        Ok(NewtonSampler {
            poly,
            derivative,
            max_itr,
            tolerance,
        })
    }

    /// The polynomial being solved.
    pub fn polynomial(&self) -> &Polynomial {
        &self.poly
    }

    /// Its derivative.
    pub fn derivative(&self) -> &Derivative {
        &self.derivative
    }

    /// The iteration cap, which doubles as the "did not converge"
    /// sentinel.
    pub fn max_itr(&self) -> u32 {
        self.max_itr
    }

    /// The convergence threshold on `|p(z)|`.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Carries on from a pixel that settled at a coarser precision
    /// until it meets this sampler's tolerance, spending only what is
    /// left of the iteration cap.  A pixel already at the cap is
    /// returned as it is.
    pub fn refine(&self, pixel: NewtonPixel) -> NewtonPixel {
        if pixel.iterations >= self.max_itr {
            return pixel;
        }
        let remaining = self.max_itr - pixel.iterations;
        let more = newton_root(
            &self.poly,
            &self.derivative,
            pixel.approx_root,
            remaining,
            self.tolerance,
        );
        NewtonPixel {
            approx_root: more.approx_root,
            iterations: pixel.iterations + more.iterations,
        }
    }
}

impl PixelKernel for NewtonSampler {
    type Output = NewtonPixel;

    #[inline]
    fn sample(&self, point: Complex<f64>) -> NewtonPixel {
        newton_root(
            &self.poly,
            &self.derivative,
            point,
            self.max_itr,
            self.tolerance,
        )
    }
}
