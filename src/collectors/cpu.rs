use std::thread;
use std::time::Duration;

#[cfg(not(target_os = "linux"))]
use sysinfo::System;

use crate::error::SamplingError;

#[cfg(target_os = "linux")]
use crate::sample::Dimension;

#[cfg(target_os = "linux")]
use super::linux;

use super::clamp_fraction;

/// Shortest window that spans several scheduler jiffies, so both reads
/// never land on the same counter values.
pub const MIN_CPU_WINDOW: Duration = Duration::from_millis(100);

/// Whole-host CPU utilization over a short window.
///
/// Utilization only exists as a difference of two counter reads, so every
/// sample blocks for `window`, never less than [`MIN_CPU_WINDOW`].
pub struct CpuSampler {
    window: Duration,
    #[cfg(not(target_os = "linux"))]
    system: System,
}

impl CpuSampler {
    pub fn new(window: Duration) -> Self {
        CpuSampler {
            window: window.max(MIN_CPU_WINDOW),
            #[cfg(not(target_os = "linux"))]
            system: System::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn sample(&mut self) -> Result<f64, SamplingError> {
        #[cfg(target_os = "linux")]
        {
            let before = linux::cpu::read_cpu_times()?;
            thread::sleep(self.window);
            let after = linux::cpu::read_cpu_times()?;
            let busy = (after - before).busy_fraction().ok_or_else(|| {
                SamplingError::unavailable(Dimension::Cpu, "no cpu time elapsed between reads")
            })?;
            Ok(clamp_fraction(busy))
        }

        #[cfg(not(target_os = "linux"))]
        {
            self.system.refresh_cpu_usage();
            thread::sleep(self.window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
            self.system.refresh_cpu_usage();
            Ok(clamp_fraction(f64::from(self.system.global_cpu_usage()) / 100.0))
        }
    }
}
