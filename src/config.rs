use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::collectors::cpu::MIN_CPU_WINDOW;
use crate::error::ConfigError;
use crate::scheduler::{SamplingFailurePolicy, SchedulerOptions};

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default)]
    pub sampling: SamplingConfig,
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub sinks: SinksConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_cpu_window_ms")]
    pub cpu_window_ms: u64,
    #[serde(default)]
    pub on_failure: FailurePolicyConfig,
    #[serde(default)]
    pub disk: DiskFilterConfig,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            cpu_window_ms: default_cpu_window_ms(),
            on_failure: FailurePolicyConfig::default(),
            disk: DiskFilterConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FailurePolicyConfig {
    #[default]
    Halt,
    Retry {
        #[serde(default = "default_initial_backoff_ms")]
        initial_backoff_ms: u64,
        #[serde(default = "default_max_backoff_ms")]
        max_backoff_ms: u64,
        max_attempts: Option<u32>,
    },
}

/// Mount-point globs applied to the disk usage sum.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct DiskFilterConfig {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SinksConfig {
    #[serde(default = "default_true")]
    pub console: bool,
    pub file: Option<String>,
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            console: true,
            file: None,
            timeout_ms: default_sink_timeout_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_seconds() -> u64 {
    15
}

fn default_cpu_window_ms() -> u64 {
    500
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_remote_timeout_ms() -> u64 {
    5_000
}

fn default_sink_timeout_ms() -> u64 {
    2_000
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        config_str.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_seconds == 0 {
            return Err(invalid("interval_seconds", "must be a positive number of seconds"));
        }
        if Duration::from_millis(self.sampling.cpu_window_ms) < MIN_CPU_WINDOW {
            return Err(invalid(
                "sampling.cpu_window_ms",
                format!("must be at least {} ms", MIN_CPU_WINDOW.as_millis()),
            ));
        }
        if self.sinks.timeout_ms == 0 {
            return Err(invalid("sinks.timeout_ms", "must be positive"));
        }
        if let Some(remote) = &self.remote {
            let url = Url::parse(&remote.url).map_err(|e| invalid("remote.url", e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid("remote.url", format!("unsupported scheme '{}'", url.scheme())));
            }
            if remote.timeout_ms == 0 {
                return Err(invalid("remote.timeout_ms", "must be positive"));
            }
        }
        if let FailurePolicyConfig::Retry { initial_backoff_ms: 0, .. } = self.sampling.on_failure {
            return Err(invalid("sampling.on_failure.initial_backoff_ms", "must be positive"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        let failure_policy = match self.sampling.on_failure {
            FailurePolicyConfig::Halt => SamplingFailurePolicy::Halt,
            FailurePolicyConfig::Retry {
                initial_backoff_ms,
                max_backoff_ms,
                max_attempts,
            } => SamplingFailurePolicy::Retry {
                initial_backoff: Duration::from_millis(initial_backoff_ms),
                max_backoff: Duration::from_millis(max_backoff_ms),
                max_attempts,
            },
        };
        SchedulerOptions {
            sink_timeout: Duration::from_millis(self.sinks.timeout_ms),
            failure_policy,
        }
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}
