use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::sample::Dimension;

/// A measurement could not be obtained. Fatal to the loop under the halt policy.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("failed to read {path} for {dimension} usage: {source}")]
    Io {
        dimension: Dimension,
        path: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{dimension} usage unavailable: {reason}")]
    Unavailable { dimension: Dimension, reason: String },

    #[error("sampling task did not complete: {0}")]
    Aborted(String),
}

impl SamplingError {
    pub fn unavailable(dimension: Dimension, reason: impl Into<String>) -> Self {
        SamplingError::Unavailable {
            dimension,
            reason: reason.into(),
        }
    }

    /// The dimension that failed, when the failure came from the provider itself.
    pub fn dimension(&self) -> Option<Dimension> {
        match self {
            SamplingError::Io { dimension, .. } | SamplingError::Unavailable { dimension, .. } => {
                Some(*dimension)
            }
            SamplingError::Aborted(_) => None,
        }
    }
}

/// A registered sink failed while handling a sample. Always contained.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// The remote POST failed or was rejected. Always contained.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("collector responded with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no Tokio runtime is available to run the sampling loop")]
    NoRuntime,
}
