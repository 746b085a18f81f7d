use async_trait::async_trait;

use crate::error::SinkError;
use crate::sample::MetricSample;

use super::Sink;

/// Prints each sample to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn on_update(&self, sample: &MetricSample) -> Result<(), SinkError> {
        println!("{sample}");
        Ok(())
    }
}
