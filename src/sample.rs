use std::fmt;

use crate::collectors::SampleProvider;
use crate::error::SamplingError;

/// The three host dimensions a sample is made of, in measurement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Cpu,
    Ram,
    Disk,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Cpu => f.write_str("cpu"),
            Dimension::Ram => f.write_str("ram"),
            Dimension::Disk => f.write_str("disk"),
        }
    }
}

/// One point-in-time reading of host utilization.
///
/// Every field is a fraction in `[0, 1]`. The value is `Copy` and has no
/// setters, so sinks only ever see the reading as it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    cpu_usage: f64,
    ram_usage: f64,
    disk_usage: f64,
}

impl MetricSample {
    pub fn new(cpu_usage: f64, ram_usage: f64, disk_usage: f64) -> Self {
        Self {
            cpu_usage,
            ram_usage,
            disk_usage,
        }
    }

    /// Takes one reading from `provider`: CPU, then RAM, then disk.
    ///
    /// The first failing dimension fails the whole sample; no default is
    /// substituted for it.
    pub fn measure<P>(provider: &mut P) -> Result<Self, SamplingError>
    where
        P: SampleProvider + ?Sized,
    {
        let cpu_usage = provider.cpu_usage()?;
        let ram_usage = provider.ram_usage()?;
        let disk_usage = provider.disk_usage()?;
        Ok(Self::new(cpu_usage, ram_usage, disk_usage))
    }

    pub fn cpu_usage(&self) -> f64 {
        self.cpu_usage
    }

    pub fn ram_usage(&self) -> f64 {
        self.ram_usage
    }

    pub fn disk_usage(&self) -> f64 {
        self.disk_usage
    }
}

impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU: {:.2}% | RAM: {:.2}% | Disk: {:.2}%",
            self.cpu_usage * 100.0,
            self.ram_usage * 100.0,
            self.disk_usage * 100.0
        )
    }
}
