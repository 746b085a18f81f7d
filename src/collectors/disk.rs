use std::sync::LazyLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use sysinfo::Disks;
use tracing::warn;

use crate::config::DiskFilterConfig;
use crate::error::SamplingError;
use crate::sample::Dimension;

use super::clamp_fraction;

static VIRTUAL_FS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(tmpfs|devtmpfs|ramfs|overlay|squashfs|proc|sysfs|devpts|cgroup2?|autofs|efivarfs|fuse\..+)$")
        .unwrap()
});

/// A mounted volume as seen by the disk sampler.
#[derive(Debug, Clone)]
pub struct Volume {
    pub mount_point: String,
    pub file_system: String,
    pub removable: bool,
    pub total_space: u64,
    pub available_space: u64,
}

/// Used share of all fixed volumes that pass the mount-point filter.
pub struct DiskSampler {
    include: GlobSet,
    exclude: GlobSet,
}

fn build_globset(patterns: &[String], kind: &str) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "invalid {kind} pattern, ignoring it");
            }
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "error building {kind} globset");
        GlobSet::empty()
    })
}

impl DiskSampler {
    pub fn new(config: &DiskFilterConfig) -> Self {
        DiskSampler {
            include: build_globset(&config.include, "include"),
            exclude: build_globset(&config.exclude, "exclude"),
        }
    }

    fn selects(&self, volume: &Volume) -> bool {
        if volume.removable || VIRTUAL_FS_RE.is_match(&volume.file_system) {
            return false;
        }
        if !self.include.is_empty() && !self.include.is_match(&volume.mount_point) {
            return false;
        }
        !self.exclude.is_match(&volume.mount_point)
    }

    pub fn used_fraction<I>(&self, volumes: I) -> Result<f64, SamplingError>
    where
        I: IntoIterator<Item = Volume>,
    {
        let (total, used) = volumes
            .into_iter()
            .filter(|volume| self.selects(volume))
            .fold((0u64, 0u64), |(total, used), volume| {
                let volume_used = volume.total_space.saturating_sub(volume.available_space);
                (total + volume.total_space, used + volume_used)
            });

        if total == 0 {
            return Err(SamplingError::unavailable(Dimension::Disk, "no fixed volume matched the disk filter"));
        }
        Ok(clamp_fraction(used as f64 / total as f64))
    }

    pub fn sample(&mut self) -> Result<f64, SamplingError> {
        let disks = Disks::new_with_refreshed_list();
        let volumes = disks.list().iter().map(|disk| Volume {
            mount_point: disk.mount_point().to_string_lossy().into_owned(),
            file_system: disk.file_system().to_string_lossy().into_owned(),
            removable: disk.is_removable(),
            total_space: disk.total_space(),
            available_space: disk.available_space(),
        });
        self.used_fraction(volumes)
    }
}
