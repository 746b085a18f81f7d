use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::EmitError;
use crate::sample::MetricSample;

/// JSON body posted to the collector.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct RemotePayload {
    pub cpu: f64,
    pub ram_used: f64,
    pub disk_used: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

impl From<&MetricSample> for RemotePayload {
    fn from(sample: &MetricSample) -> Self {
        RemotePayload {
            cpu: round2(sample.cpu_usage()),
            ram_used: round2(sample.ram_usage()),
            disk_used: round2(sample.disk_usage()),
        }
    }
}

/// Posts samples to a remote collector. Owns its HTTP client.
pub struct RemoteEmitter {
    client: Client,
    endpoint: Url,
}

impl RemoteEmitter {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, EmitError> {
        let endpoint = Url::parse(endpoint).map_err(|e| EmitError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(RemoteEmitter { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// One bounded POST attempt. Non-2xx responses are errors.
    pub async fn emit(&self, sample: &MetricSample) -> Result<StatusCode, EmitError> {
        let payload = RemotePayload::from(sample);
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmitError::Status(status));
        }
        Ok(status)
    }

    /// `emit` with the failure logged and swallowed. Returns whether the
    /// collector accepted the sample.
    pub async fn deliver(&self, sample: &MetricSample) -> bool {
        match self.emit(sample).await {
            Ok(status) => {
                debug!(endpoint = %self.endpoint, %status, "posted sample");
                true
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "failed to post sample");
                false
            }
        }
    }
}
