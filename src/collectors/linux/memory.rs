use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader};

use crate::error::SamplingError;
use crate::sample::Dimension;

const PROC_MEMINFO: &str = "/proc/meminfo";

/// Parses `/proc/meminfo` into a key -> kB map.
pub fn parse_meminfo<R: BufRead>(reader: R) -> io::Result<HashMap<String, u64>> {
    let mut meminfo = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            let key = parts[0].trim_end_matches(':').to_string();
            let value = parts[1].parse().unwrap_or(0);
            meminfo.insert(key, value);
        }
    }

    Ok(meminfo)
}

/// `(MemTotal - MemAvailable) / MemTotal`, with `MemFree` standing in on
/// kernels that predate `MemAvailable`.
pub fn used_fraction(meminfo: &HashMap<String, u64>) -> Result<f64, SamplingError> {
    let total = meminfo.get("MemTotal").copied().unwrap_or(0);
    if total == 0 {
        return Err(SamplingError::unavailable(Dimension::Ram, "MemTotal is missing or zero"));
    }
    let available = meminfo
        .get("MemAvailable")
        .or_else(|| meminfo.get("MemFree"))
        .copied()
        .ok_or_else(|| SamplingError::unavailable(Dimension::Ram, "neither MemAvailable nor MemFree is reported"))?;

    Ok(total.saturating_sub(available) as f64 / total as f64)
}

pub fn read_used_fraction() -> Result<f64, SamplingError> {
    let io_err = |source| SamplingError::Io {
        dimension: Dimension::Ram,
        path: PROC_MEMINFO,
        source,
    };
    let file = fs::File::open(PROC_MEMINFO).map_err(io_err)?;
    let meminfo = parse_meminfo(BufReader::new(file)).map_err(io_err)?;
    used_fraction(&meminfo)
}
