#[cfg(not(target_os = "linux"))]
use sysinfo::System;

use crate::error::SamplingError;

#[cfg(not(target_os = "linux"))]
use crate::sample::Dimension;

#[cfg(target_os = "linux")]
use super::linux;

use super::clamp_fraction;

pub struct MemorySampler {
    #[cfg(not(target_os = "linux"))]
    system: System,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "linux"))]
            system: System::new(),
        }
    }

    pub fn sample(&mut self) -> Result<f64, SamplingError> {
        #[cfg(target_os = "linux")]
        {
            linux::memory::read_used_fraction().map(clamp_fraction)
        }

        #[cfg(not(target_os = "linux"))]
        {
            self.system.refresh_memory();
            let total = self.system.total_memory();
            if total == 0 {
                return Err(SamplingError::unavailable(Dimension::Ram, "total memory reported as zero"));
            }
            Ok(clamp_fraction(self.system.used_memory() as f64 / total as f64))
        }
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}
