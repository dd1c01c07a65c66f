//! Execution policy.  Which strategy runs a sampling call is a value
//! passed into that call; nothing here is global.

use gpu;

/// The strategy that computes the pixels of one call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Accelerator {
    /// Bands of rows across `workers` scoped threads.  Zero means one
    /// worker per logical CPU.
    Cpu {
        /// Number of worker threads.
        workers: usize,
    },
    /// One shader invocation per pixel.
    Gpu,
}

impl Default for Accelerator {
    fn default() -> Accelerator {
        Accelerator::Cpu { workers: 0 }
    }
}

/// Per-call configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleConfig {
    /// How the pixels get computed.
    pub accelerator: Accelerator,
}

impl SampleConfig {
    /// The CPU strategy with `workers` threads.
    pub fn cpu(workers: usize) -> SampleConfig {
        SampleConfig {
            accelerator: Accelerator::Cpu { workers },
        }
    }

    /// The GPU strategy.
    pub fn gpu() -> SampleConfig {
        SampleConfig {
            accelerator: Accelerator::Gpu,
        }
    }
}

/// What this machine can do, as found at startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// A GPU device could be acquired.
    pub gpu: bool,
    /// Logical CPUs.
    pub cpus: usize,
}

impl Capabilities {
    /// Inspects the machine.  Acquiring a GPU device is not free, so call
    /// this once and keep the answer.
    pub fn detect() -> Capabilities {
        let capabilities = Capabilities {
            gpu: gpu::usable(),
            cpus: num_cpus::get(),
        };
        debug!("{:?}", capabilities);
        capabilities
    }

    /// The configuration to use when the caller would like the GPU but
    /// will settle for the CPU.
    pub fn preferred(&self) -> SampleConfig {
        if self.gpu {
            SampleConfig::gpu()
        } else {
            SampleConfig::cpu(self.cpus)
        }
    }
}
