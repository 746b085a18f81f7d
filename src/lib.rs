//! Periodic host resource sampling with pluggable sinks and a remote
//! HTTP collector.

pub mod collectors;
pub mod config;
pub mod error;
pub mod exporters;
pub mod sample;
pub mod scheduler;
pub mod sinks;

pub use collectors::{HostProvider, SampleProvider};
pub use config::Config;
pub use error::{ConfigError, EmitError, SamplingError, SchedulerError, SinkError};
pub use exporters::{RemoteEmitter, RemotePayload};
pub use sample::{Dimension, MetricSample};
pub use scheduler::{SamplingFailurePolicy, SamplingScheduler, SchedulerOptions, SchedulerState, StopReason};
pub use sinks::{ConsoleSink, FileSink, Sink, SinkRegistry};
