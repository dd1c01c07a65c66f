// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ways a sampling call can be refused.  Every one of these is
//! raised before any worker starts, except `AcceleratorUnavailable`,
//! which the GPU path raises while acquiring a device.  A pixel whose
//! iteration degenerates is never an error; it is recorded with the
//! sentinel values instead.

/// Failure kinds for a sampling call.  No partial grid accompanies any
/// of them.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum SampleError {
    /// Zero resolution, a zero or non-finite span, or a non-finite
    /// center.
    #[fail(display = "invalid grid: {}", _0)]
    InvalidGrid(String),

    /// The iteration cap must be at least one.
    #[fail(display = "iteration bound must be positive, got {}", _0)]
    InvalidIterationBound(u32),

    /// Fewer than two coefficients, a zero leading coefficient, or a
    /// non-finite coefficient.
    #[fail(display = "invalid polynomial: {}", _0)]
    InvalidPolynomial(String),

    /// The GPU path was requested but no usable device exists.  The
    /// caller may retry on the CPU path.
    #[fail(display = "accelerator unavailable: {}", _0)]
    AcceleratorUnavailable(String),
}

impl SampleError {
    /// True for the one recoverable kind.
    pub fn is_recoverable(&self) -> bool {
        match *self {
            SampleError::AcceleratorUnavailable(_) => true,
            _ => false,
        }
    }
}

/// Rejects an iteration cap of zero.
pub fn check_iteration_bound(max_itr: u32) -> Result<u32, SampleError> {
    if max_itr == 0 {
        return Err(SampleError::InvalidIterationBound(max_itr));
    }
    Ok(max_itr)
}
