use std::fs;
use std::io::{self, BufRead, BufReader};

use crate::error::SamplingError;
use crate::sample::Dimension;

const PROC_STAT: &str = "/proc/stat";

/// Cumulative jiffies of the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl std::ops::Sub for CpuTimes {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self {
            user: self.user.saturating_sub(other.user),
            nice: self.nice.saturating_sub(other.nice),
            system: self.system.saturating_sub(other.system),
            idle: self.idle.saturating_sub(other.idle),
            iowait: self.iowait.saturating_sub(other.iowait),
            irq: self.irq.saturating_sub(other.irq),
            softirq: self.softirq.saturating_sub(other.softirq),
            steal: self.steal.saturating_sub(other.steal),
        }
    }
}

impl CpuTimes {
    // guest and guest_nice are already accounted in user and nice.
    fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq + self.steal
    }

    /// Share of non-idle time. `None` when no time elapsed.
    pub fn busy_fraction(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let idle = self.idle + self.iowait;
        Some(total.saturating_sub(idle) as f64 / total as f64)
    }
}

/// Finds the aggregate `cpu` line and parses it.
pub fn parse_cpu_times<R: BufRead>(reader: R) -> io::Result<Option<CpuTimes>> {
    for line in reader.lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"cpu") {
            continue;
        }
        if parts.len() < 9 {
            // cpu + at least 8 fields
            return Ok(None);
        }
        return Ok(Some(CpuTimes {
            user: parts[1].parse().unwrap_or(0),
            nice: parts[2].parse().unwrap_or(0),
            system: parts[3].parse().unwrap_or(0),
            idle: parts[4].parse().unwrap_or(0),
            iowait: parts[5].parse().unwrap_or(0),
            irq: parts[6].parse().unwrap_or(0),
            softirq: parts[7].parse().unwrap_or(0),
            steal: parts[8].parse().unwrap_or(0),
        }));
    }
    Ok(None)
}

pub fn read_cpu_times() -> Result<CpuTimes, SamplingError> {
    let io_err = |source| SamplingError::Io {
        dimension: Dimension::Cpu,
        path: PROC_STAT,
        source,
    };
    let file = fs::File::open(PROC_STAT).map_err(io_err)?;
    parse_cpu_times(BufReader::new(file))
        .map_err(io_err)?
        .ok_or_else(|| SamplingError::unavailable(Dimension::Cpu, "no aggregate cpu line in /proc/stat"))
}
