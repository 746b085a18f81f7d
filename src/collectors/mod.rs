#[cfg(target_os = "linux")]
pub mod linux;

pub mod cpu;
pub mod disk;
pub mod memory;

use std::time::Duration;

use crate::config::SamplingConfig;
use crate::error::SamplingError;

use cpu::CpuSampler;
use disk::DiskSampler;
use memory::MemorySampler;

/// Source of host utilization readings.
///
/// Every call blocks until its counters are read and returns a fraction in
/// `[0, 1]`. The scheduler calls the three methods in order, once per tick,
/// from a blocking thread.
pub trait SampleProvider: Send {
    fn cpu_usage(&mut self) -> Result<f64, SamplingError>;
    fn ram_usage(&mut self) -> Result<f64, SamplingError>;
    fn disk_usage(&mut self) -> Result<f64, SamplingError>;
}

impl<P: SampleProvider + ?Sized> SampleProvider for Box<P> {
    fn cpu_usage(&mut self) -> Result<f64, SamplingError> {
        (**self).cpu_usage()
    }

    fn ram_usage(&mut self) -> Result<f64, SamplingError> {
        (**self).ram_usage()
    }

    fn disk_usage(&mut self) -> Result<f64, SamplingError> {
        (**self).disk_usage()
    }
}

/// Reads the local host's counters.
pub struct HostProvider {
    cpu: CpuSampler,
    memory: MemorySampler,
    disk: DiskSampler,
}

impl HostProvider {
    pub fn new(config: &SamplingConfig) -> Self {
        HostProvider {
            cpu: CpuSampler::new(Duration::from_millis(config.cpu_window_ms)),
            memory: MemorySampler::new(),
            disk: DiskSampler::new(&config.disk),
        }
    }
}

impl SampleProvider for HostProvider {
    fn cpu_usage(&mut self) -> Result<f64, SamplingError> {
        self.cpu.sample()
    }

    fn ram_usage(&mut self) -> Result<f64, SamplingError> {
        self.memory.sample()
    }

    fn disk_usage(&mut self) -> Result<f64, SamplingError> {
        self.disk.sample()
    }
}

pub(crate) fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.clamp(0.0, 1.0)
    }
}
