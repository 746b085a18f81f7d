pub mod console;
pub mod file;

use std::any::Any;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::SinkError;
use crate::sample::MetricSample;

pub use console::ConsoleSink;
pub use file::FileSink;

/// A pluggable consumer of samples.
///
/// Implementations should contain their own failures, but the registry
/// tolerates returned errors, panics and calls that never finish.
///
/// Each call runs as its own task. On a multi-threaded runtime that bounds
/// even a sink that blocks its thread; on a current-thread runtime only a
/// sink that yields at `.await` points can be cut off.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;
    async fn on_update(&self, sample: &MetricSample) -> Result<(), SinkError>;
}

/// Outcome of one distribution round.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    pub delivered: usize,
    pub failed: usize,
}

/// Add-only set of sinks shared between the scheduler loop and any
/// registering context.
///
/// Distribution works on a snapshot, so `register` never waits for an
/// in-flight round and a sink added mid-round joins from the next one.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn Sink>) {
        debug!(sink = sink.name(), "registering sink");
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.sinks.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn snapshot(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Hands `sample` to every registered sink concurrently and waits for
    /// all of them, each bounded by `timeout`.
    ///
    /// A sink that errors, panics or times out is logged and counted; it
    /// never affects the others.
    pub async fn distribute(&self, sample: &MetricSample, timeout: Duration) -> Distribution {
        let sinks = self.snapshot();
        let outcomes = join_all(sinks.iter().map(|sink| invoke(sink.clone(), *sample, timeout))).await;

        let mut distribution = Distribution::default();
        for (sink, outcome) in sinks.iter().zip(outcomes) {
            match outcome {
                Ok(()) => distribution.delivered += 1,
                Err(e) => {
                    warn!(sink = sink.name(), error = %e, "sink failed to handle sample");
                    distribution.failed += 1;
                }
            }
        }
        distribution
    }
}

async fn invoke(sink: Arc<dyn Sink>, sample: MetricSample, timeout: Duration) -> Result<(), SinkError> {
    let mut call = tokio::spawn(async move { sink.on_update(&sample).await });
    match tokio::time::timeout(timeout, &mut call).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) if e.is_panic() => Err(SinkError::Panicked(panic_message(e.into_panic()))),
        Ok(Err(e)) => Err(SinkError::Other(e.to_string())),
        Err(_) => {
            call.abort();
            Err(SinkError::TimedOut(timeout))
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
