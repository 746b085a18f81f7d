use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rsysmonitor::{
    Config, ConsoleSink, FileSink, HostProvider, MetricSample, RemoteEmitter, RemotePayload, SamplingScheduler,
    StopReason,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "rsysmonitor.toml";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Check for --oneshot and --config <path>
    let args: Vec<String> = env::args().collect();
    let oneshot = args.iter().any(|arg| arg == "--oneshot");
    let config_path = args
        .iter()
        .skip_while(|arg| *arg != "--config")
        .nth(1)
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);

    let config = Config::load(config_path).with_context(|| format!("loading {config_path}"))?;
    info!(?config, "loaded config");

    let mut provider = HostProvider::new(&config.sampling);

    if oneshot {
        info!("running in oneshot mode, the sample is printed and not posted");
        let sample = tokio::task::spawn_blocking(move || MetricSample::measure(&mut provider))
            .await
            .context("sampling task failed")??;
        println!("{sample}");
        println!("{}", serde_json::to_string(&RemotePayload::from(&sample))?);
        return Ok(ExitCode::SUCCESS);
    }

    let emitter = config
        .remote
        .as_ref()
        .map(|remote| RemoteEmitter::new(&remote.url, remote.timeout()))
        .transpose()
        .context("creating remote emitter")?;

    let scheduler = SamplingScheduler::with_options(provider, emitter, config.scheduler_options());
    if config.sinks.console {
        scheduler.register(Arc::new(ConsoleSink));
    }
    if let Some(path) = &config.sinks.file {
        scheduler.register(Arc::new(FileSink::new(path)));
    }

    scheduler.start(config.interval())?;

    let reason = tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for ctrl-c, stopping");
            }
            info!("shutting down");
            if !scheduler.shutdown(SHUTDOWN_TIMEOUT).await {
                return Ok(ExitCode::FAILURE);
            }
            scheduler.stop_reason().unwrap_or(StopReason::Cancelled)
        }
        reason = scheduler.wait() => reason,
    };

    if reason.is_failure() {
        warn!(?reason, "sampling loop halted");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
