//! The GPU strategy: one shader invocation per pixel, no communication
//! between invocations, and a blocking readback before the caller gets
//! anything.  It is compiled only with the `gpu` feature.  Without it,
//! or on a machine with no usable adapter, acquiring a device fails with
//! `AcceleratorUnavailable` and the caller decides what to do next.
//!
//! Shaders compute in single precision, so samples agree with the CPU
//! strategy to within f32 rounding rather than bit for bit.

use errors::SampleError;

#[cfg(feature = "gpu")]
mod device;

#[cfg(feature = "gpu")]
pub use self::device::Device;

#[cfg(not(feature = "gpu"))]
pub use self::absent::Device;

fn unavailable(reason: &str) -> SampleError {
    SampleError::AcceleratorUnavailable(reason.to_string())
}

/// True if a device can be acquired right now.
pub fn usable() -> bool {
    match Device::acquire() {
        Ok(device) => {
            info!("GPU available: {}", device.name());
            true
        }
        Err(e) => {
            debug!("GPU check failed: {}", e);
            false
        }
    }
}

#[cfg(not(feature = "gpu"))]
mod absent {
    use super::unavailable;
    use errors::SampleError;
    use escape::EscapeTimeSampler;
    use grid::SampleGrid;
    use newton::{NewtonPixel, NewtonSampler};

    /// Stands in for a device in builds without GPU support.  It can
    /// never be acquired.
    pub struct Device {
        _never: (),
    }

    impl Device {
        /// Always fails.
        pub fn acquire() -> Result<Device, SampleError> {
            Err(unavailable("built without the `gpu` feature"))
        }

        /// Never reached.
        pub fn name(&self) -> &str {
            "none"
        }

        /// Never reached.
        pub fn escape_time(
            &self,
            _grid: &SampleGrid,
            _sampler: &EscapeTimeSampler,
        ) -> Result<Vec<u32>, SampleError> {
            Err(unavailable("built without the `gpu` feature"))
        }

        /// Never reached.
        pub fn newton(
            &self,
            _grid: &SampleGrid,
            _sampler: &NewtonSampler,
        ) -> Result<Vec<NewtonPixel>, SampleError> {
            Err(unavailable("built without the `gpu` feature"))
        }
    }

}
