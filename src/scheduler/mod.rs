//! The sampling loop.
//!
//! A [`SamplingScheduler`] owns one provider, an optional remote emitter and
//! a sink registry. `start` spawns a single background task that repeats:
//!
//! 1. measure CPU, RAM and disk on a blocking thread,
//! 2. hand the sample to every registered sink concurrently (each call
//!    bounded and isolated),
//! 3. post it to the remote collector (failures logged and swallowed),
//! 4. sleep `interval`, or return early on `stop`.
//!
//! The interval is a delay after the work, so the observed period is
//! sampling time + distribution time + interval. Ticks never overlap.

pub mod backoff;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collectors::SampleProvider;
use crate::error::{SamplingError, SchedulerError};
use crate::exporters::RemoteEmitter;
use crate::sample::MetricSample;
use crate::sinks::{Sink, SinkRegistry};

pub use backoff::{Backoff, SamplingFailurePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Why the loop stopped producing samples.
#[derive(Debug, Clone)]
pub enum StopReason {
    /// `stop` was requested (or the scheduler was dropped).
    Cancelled,
    /// A measurement failed and the failure policy gave up.
    SamplingFailed(Arc<SamplingError>),
    /// The loop task ended without reaching a stop point, e.g. it panicked.
    Aborted,
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        !matches!(self, StopReason::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Upper bound for a single sink's `on_update`.
    pub sink_timeout: Duration,
    pub failure_policy: SamplingFailurePolicy,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            sink_timeout: Duration::from_secs(2),
            failure_policy: SamplingFailurePolicy::Halt,
        }
    }
}

type SharedProvider = Arc<Mutex<Box<dyn SampleProvider>>>;

/// Everything the loop task takes ownership of on `start`.
struct LoopParts {
    provider: SharedProvider,
    emitter: Option<RemoteEmitter>,
    options: SchedulerOptions,
}

struct Shared {
    state: Mutex<SchedulerState>,
    registry: Arc<SinkRegistry>,
    cancel: CancellationToken,
    finished: CancellationToken,
    stop_reason: Mutex<Option<StopReason>>,
    ticks: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn state(&self) -> SchedulerState {
        *lock(&self.state)
    }

    fn begin_stopping(&self) {
        let mut state = lock(&self.state);
        if *state == SchedulerState::Running {
            *state = SchedulerState::Stopping;
        }
    }

    /// Teardown. Only the first call has an effect.
    fn finish(&self, reason: StopReason) {
        {
            let mut state = lock(&self.state);
            if *state == SchedulerState::Stopped {
                return;
            }
            *state = SchedulerState::Stopped;
        }
        info!(?reason, ticks = self.ticks.load(Ordering::Relaxed), "sampling loop stopped");
        *lock(&self.stop_reason) = Some(reason);
        self.registry.clear();
        self.cancel.cancel();
        self.finished.cancel();
    }
}

/// Runs teardown when the loop task ends, on every exit path.
struct TeardownGuard {
    shared: Arc<Shared>,
    reason: Option<StopReason>,
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let reason = self.reason.take().unwrap_or(StopReason::Aborted);
        self.shared.finish(reason);
    }
}

/// Fixed-interval sampler fanning each sample out to sinks and a remote
/// collector. Single use: once stopped it cannot be started again.
pub struct SamplingScheduler {
    shared: Arc<Shared>,
    parts: Mutex<Option<LoopParts>>,
}

impl SamplingScheduler {
    pub fn new<P>(provider: P, emitter: Option<RemoteEmitter>) -> Self
    where
        P: SampleProvider + 'static,
    {
        Self::with_options(provider, emitter, SchedulerOptions::default())
    }

    pub fn with_options<P>(provider: P, emitter: Option<RemoteEmitter>, options: SchedulerOptions) -> Self
    where
        P: SampleProvider + 'static,
    {
        let provider: Box<dyn SampleProvider> = Box::new(provider);
        SamplingScheduler {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState::Idle),
                registry: Arc::new(SinkRegistry::new()),
                cancel: CancellationToken::new(),
                finished: CancellationToken::new(),
                stop_reason: Mutex::new(None),
                ticks: AtomicU64::new(0),
            }),
            parts: Mutex::new(Some(LoopParts {
                provider: Arc::new(Mutex::new(provider)),
                emitter,
                options,
            })),
        }
    }

    pub fn register(&self, sink: Arc<dyn Sink>) {
        self.shared.registry.register(sink);
    }

    /// The registry the loop distributes to, for registering from other tasks.
    pub fn registry(&self) -> Arc<SinkRegistry> {
        Arc::clone(&self.shared.registry)
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    /// Number of ticks that completed distribution.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        lock(&self.shared.stop_reason).clone()
    }

    /// Spawns the loop on the current Tokio runtime and returns immediately.
    ///
    /// The first tick starts right away. Calling `start` on a scheduler that
    /// is running or already stopped does nothing.
    pub fn start(&self, interval: Duration) -> Result<(), SchedulerError> {
        let mut state = lock(&self.shared.state);
        if *state != SchedulerState::Idle {
            debug!(state = ?*state, "start ignored");
            return Ok(());
        }
        let handle = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let Some(parts) = lock(&self.parts).take() else {
            return Ok(());
        };
        *state = SchedulerState::Running;
        drop(state);

        info!(
            ?interval,
            sinks = self.shared.registry.len(),
            remote = parts.emitter.as_ref().map(|e| e.endpoint().as_str()),
            "starting sampling loop"
        );
        handle.spawn(run(parts, Arc::clone(&self.shared), interval));
        Ok(())
    }

    /// Requests the loop to stop. An in-flight tick completes; no new tick
    /// starts. Safe to call any number of times, from anywhere, in any state.
    pub fn stop(&self) {
        let mut state = lock(&self.shared.state);
        match *state {
            SchedulerState::Idle => {
                *state = SchedulerState::Stopping;
                drop(state);
                lock(&self.parts).take();
                self.shared.finish(StopReason::Cancelled);
            }
            SchedulerState::Running => {
                *state = SchedulerState::Stopping;
                drop(state);
                info!("stop requested");
                self.shared.cancel.cancel();
            }
            SchedulerState::Stopping | SchedulerState::Stopped => {}
        }
    }

    /// Resolves once the loop has torn down. Never resolves for a scheduler
    /// that is neither started nor stopped.
    pub async fn wait(&self) -> StopReason {
        self.shared.finished.cancelled().await;
        self.stop_reason().unwrap_or(StopReason::Aborted)
    }

    /// `stop` followed by a bounded `wait`. Returns whether teardown
    /// completed within `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.stop();
        match tokio::time::timeout(timeout, self.shared.finished.cancelled()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(?timeout, "sampling loop did not stop in time");
                false
            }
        }
    }
}

impl Drop for SamplingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(parts: LoopParts, shared: Arc<Shared>, interval: Duration) {
    let mut guard = TeardownGuard {
        shared: Arc::clone(&shared),
        reason: None,
    };
    let reason = sampling_loop(parts, &shared, interval).await;
    guard.reason = Some(reason);
}

async fn sampling_loop(parts: LoopParts, shared: &Shared, interval: Duration) -> StopReason {
    let LoopParts {
        provider,
        emitter,
        options,
    } = parts;
    let mut backoff = options.failure_policy.backoff();

    loop {
        if shared.cancel.is_cancelled() {
            return StopReason::Cancelled;
        }

        let sample = match measure(&provider).await {
            Ok(sample) => {
                if let Some(backoff) = backoff.as_mut() {
                    backoff.mark_success();
                }
                sample
            }
            Err(e) => match backoff.as_mut().and_then(Backoff::mark_failure) {
                Some(delay) => {
                    warn!(error = %e, retry_in = ?delay, "sampling failed, retrying");
                    if !pause(&shared.cancel, delay).await {
                        return StopReason::Cancelled;
                    }
                    continue;
                }
                None => {
                    error!(error = %e, "sampling failed, halting the sampling loop");
                    shared.begin_stopping();
                    return StopReason::SamplingFailed(Arc::new(e));
                }
            },
        };

        let tick = shared.ticks.load(Ordering::Relaxed) + 1;
        debug!(tick, %sample, "distributing sample");
        let distribution = shared.registry.distribute(&sample, options.sink_timeout).await;
        if distribution.failed > 0 {
            debug!(tick, failed = distribution.failed, delivered = distribution.delivered, "some sinks failed");
        }
        if let Some(emitter) = &emitter {
            emitter.deliver(&sample).await;
        }
        shared.ticks.store(tick, Ordering::Relaxed);

        if !pause(&shared.cancel, interval).await {
            return StopReason::Cancelled;
        }
    }
}

/// Takes one sample on the blocking pool.
async fn measure(provider: &SharedProvider) -> Result<MetricSample, SamplingError> {
    let provider = Arc::clone(provider);
    tokio::task::spawn_blocking(move || {
        let mut provider = lock(&provider);
        MetricSample::measure(&mut **provider)
    })
    .await
    .map_err(|e| SamplingError::Aborted(e.to_string()))?
}

/// Sleeps for `duration`. Returns `false` if cancelled first.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::thread;

    use async_trait::async_trait;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::SinkError;
    use crate::sample::Dimension;
    use crate::sinks::FileSink;
    use crate::sinks::testing::{FailingSink, PanickingSink, RecordingSink};

    const SECOND: Duration = Duration::from_secs(1);

    #[derive(Default)]
    struct CallLog {
        attempts: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    type FailurePlan = Box<dyn Fn(usize) -> Option<Dimension> + Send>;

    /// Returns (0.5, 0.3, 0.2) unless `plan` says attempt `n` fails.
    struct ScriptedProvider {
        plan: FailurePlan,
        attempt: usize,
        calls: Arc<CallLog>,
    }

    impl ScriptedProvider {
        fn healthy(calls: &Arc<CallLog>) -> Self {
            Self::with_plan(calls, Box::new(|_| None))
        }

        fn failing_after(successes: usize, dimension: Dimension, calls: &Arc<CallLog>) -> Self {
            Self::with_plan(calls, Box::new(move |n| (n >= successes).then_some(dimension)))
        }

        fn with_plan(calls: &Arc<CallLog>, plan: FailurePlan) -> Self {
            ScriptedProvider {
                plan,
                attempt: 0,
                calls: Arc::clone(calls),
            }
        }

        fn read(&self, dimension: Dimension, value: f64) -> Result<f64, SamplingError> {
            if (self.plan)(self.attempt) == Some(dimension) {
                return Err(SamplingError::unavailable(dimension, "scripted failure"));
            }
            Ok(value)
        }
    }

    impl SampleProvider for ScriptedProvider {
        fn cpu_usage(&mut self) -> Result<f64, SamplingError> {
            self.attempt = self.calls.attempts.fetch_add(1, Ordering::SeqCst);
            let in_flight = self.calls.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.calls.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            self.calls.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.read(Dimension::Cpu, 0.5)
        }

        fn ram_usage(&mut self) -> Result<f64, SamplingError> {
            self.read(Dimension::Ram, 0.3)
        }

        fn disk_usage(&mut self) -> Result<f64, SamplingError> {
            self.read(Dimension::Disk, 0.2)
        }
    }

    /// Holds the tick inside a sink until released.
    struct GateSink {
        entered: Notify,
        release: Notify,
        completed: AtomicBool,
    }

    #[async_trait]
    impl Sink for GateSink {
        fn name(&self) -> &str {
            "gate"
        }

        async fn on_update(&self, _sample: &MetricSample) -> Result<(), SinkError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.completed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_tick_reaches_every_sink_despite_failures() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);
        let recorders: Vec<Arc<RecordingSink>> = (0..3).map(|_| Arc::new(RecordingSink::default())).collect();
        scheduler.register(Arc::new(FailingSink));
        scheduler.register(Arc::new(PanickingSink));
        for recorder in &recorders {
            scheduler.register(recorder.clone());
        }

        scheduler.start(SECOND).unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(scheduler.shutdown(SECOND).await);

        let ticks = scheduler.ticks() as usize;
        assert!(ticks >= 3, "only {ticks} ticks");
        for recorder in &recorders {
            assert_eq!(recorder.count(), ticks);
            assert!(recorder.received.lock().unwrap().iter().all(|s| *s == MetricSample::new(0.5, 0.3, 0.2)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_at_least_one_interval_apart() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);
        let recorder = Arc::new(RecordingSink::default());
        scheduler.register(recorder.clone());

        scheduler.start(SECOND).unwrap();
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        scheduler.shutdown(SECOND).await;

        let at = recorder.at.lock().unwrap().clone();
        assert!(at.len() >= 4);
        for pair in at.windows(2) {
            assert!(pair[1] - pair[0] >= SECOND);
        }
        assert_eq!(calls.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_sink_scenario_halts_after_fourth_tick_fails() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("metrics_log.txt");
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::failing_after(3, Dimension::Disk, &calls), None);
        scheduler.register(Arc::new(FileSink::new(&log_path)));

        scheduler.start(SECOND).unwrap();
        let reason = scheduler.wait().await;

        match reason {
            StopReason::SamplingFailed(e) => assert_eq!(e.dimension(), Some(Dimension::Disk)),
            other => panic!("unexpected stop reason {other:?}"),
        }
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.ticks(), 3);
        assert_eq!(calls.attempts.load(Ordering::SeqCst), 4);

        let contents = tokio::fs::read_to_string(&log_path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["CPU: 50.00% | RAM: 30.00% | Disk: 20.00%"; 3]);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_on_any_dimension_halts() {
        for dimension in [Dimension::Cpu, Dimension::Ram, Dimension::Disk] {
            let calls = Arc::new(CallLog::default());
            let scheduler = SamplingScheduler::new(ScriptedProvider::failing_after(2, dimension, &calls), None);
            let recorder = Arc::new(RecordingSink::default());
            scheduler.register(recorder.clone());

            scheduler.start(SECOND).unwrap();
            let reason = scheduler.wait().await;

            assert!(reason.is_failure());
            assert_eq!(recorder.count(), 2, "failing {dimension}");
            tokio::time::sleep(Duration::from_secs(3)).await;
            assert_eq!(recorder.count(), 2, "failing {dimension}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_recovers_from_transient_failures() {
        let calls = Arc::new(CallLog::default());
        let provider = ScriptedProvider::with_plan(&calls, Box::new(|n| (n < 2).then_some(Dimension::Ram)));
        let options = SchedulerOptions {
            failure_policy: SamplingFailurePolicy::Retry {
                initial_backoff: Duration::from_millis(100),
                max_backoff: SECOND,
                max_attempts: None,
            },
            ..SchedulerOptions::default()
        };
        let scheduler = SamplingScheduler::with_options(provider, None, options);
        let recorder = Arc::new(RecordingSink::default());
        scheduler.register(recorder.clone());

        scheduler.start(SECOND).unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(recorder.count() >= 1);
        assert!(scheduler.shutdown(SECOND).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_halts_when_budget_is_spent() {
        let calls = Arc::new(CallLog::default());
        let provider = ScriptedProvider::failing_after(0, Dimension::Cpu, &calls);
        let options = SchedulerOptions {
            failure_policy: SamplingFailurePolicy::Retry {
                initial_backoff: Duration::from_millis(100),
                max_backoff: SECOND,
                max_attempts: Some(2),
            },
            ..SchedulerOptions::default()
        };
        let scheduler = SamplingScheduler::with_options(provider, None, options);

        scheduler.start(SECOND).unwrap();
        let reason = scheduler.wait().await;

        assert!(matches!(reason, StopReason::SamplingFailed(_)));
        assert_eq!(calls.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_collector_does_not_halt() {
        const EMIT_TIMEOUT: Duration = Duration::from_millis(200);

        let calls = Arc::new(CallLog::default());
        let emitter = RemoteEmitter::new("http://127.0.0.1:9/metrics", EMIT_TIMEOUT).unwrap();
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), Some(emitter));
        let recorder = Arc::new(RecordingSink::default());
        scheduler.register(recorder.clone());

        scheduler.start(SECOND).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(scheduler.shutdown(SECOND).await);

        // Each failed post costs at most the client timeout on top of the interval.
        let at = recorder.at.lock().unwrap().clone();
        assert!(at.len() >= 4, "only {} ticks in 5s", at.len());
        for pair in at.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= SECOND, "ticks {gap:?} apart");
            assert!(gap <= SECOND + EMIT_TIMEOUT + Duration::from_millis(10), "ticks {gap:?} apart");
        }
    }

    #[tokio::test]
    async fn test_collector_receives_sample_despite_failing_sink() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/metrics")
            .match_body(Matcher::Json(json!({ "cpu": 0.5, "ram_used": 0.3, "disk_used": 0.2 })))
            .with_status(200)
            .expect_at_least(1)
            .create_async()
            .await;

        let calls = Arc::new(CallLog::default());
        let emitter = RemoteEmitter::new(&format!("{}/metrics", server.url()), SECOND).unwrap();
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), Some(emitter));
        scheduler.register(Arc::new(FailingSink));

        scheduler.start(Duration::from_millis(50)).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(scheduler.shutdown(SECOND).await);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);

        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        scheduler.start(SECOND).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(matches!(scheduler.wait().await, StopReason::Cancelled));
        assert_eq!(calls.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_runs_one_loop() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);

        scheduler.start(SECOND).unwrap();
        scheduler.start(SECOND).unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        scheduler.stop();
        scheduler.stop();
        assert!(matches!(scheduler.wait().await, StopReason::Cancelled));
        scheduler.stop();

        assert_eq!(calls.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(calls.attempts.load(Ordering::SeqCst) as u64, scheduler.ticks());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_in_flight_tick_finish() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);
        let gate = Arc::new(GateSink {
            entered: Notify::new(),
            release: Notify::new(),
            completed: AtomicBool::new(false),
        });
        scheduler.register(gate.clone());

        scheduler.start(SECOND).unwrap();
        gate.entered.notified().await;
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopping);
        gate.release.notify_one();

        assert!(matches!(scheduler.wait().await, StopReason::Cancelled));
        assert!(gate.completed.load(Ordering::SeqCst));
        assert_eq!(scheduler.ticks(), 1);
        assert_eq!(calls.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_registered_while_running_gets_later_ticks() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);
        scheduler.start(SECOND).unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let late = Arc::new(RecordingSink::default());
        let registry = scheduler.registry();
        let ticks_before = scheduler.ticks();
        tokio::spawn({
            let late = late.clone();
            async move { registry.register(late) }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        scheduler.shutdown(SECOND).await;

        let later_ticks = (scheduler.ticks() - ticks_before) as usize;
        assert!(later_ticks >= 3);
        assert!(late.count() + 1 >= later_ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_clears_registry_once() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);
        scheduler.register(Arc::new(RecordingSink::default()));
        let registry = scheduler.registry();

        scheduler.start(SECOND).unwrap();
        assert!(scheduler.shutdown(SECOND).await);
        assert!(registry.is_empty());

        assert!(scheduler.shutdown(SECOND).await);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_requests_stop() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);
        let registry = scheduler.registry();
        registry.register(Arc::new(RecordingSink::default()));

        scheduler.start(SECOND).unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        drop(scheduler);
        tokio::time::sleep(Duration::from_secs(3)).await;

        let attempts = calls.attempts.load(Ordering::SeqCst);
        assert!(registry.is_empty());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(calls.attempts.load(Ordering::SeqCst), attempts);
    }

    #[test]
    fn test_start_outside_runtime() {
        let calls = Arc::new(CallLog::default());
        let scheduler = SamplingScheduler::new(ScriptedProvider::healthy(&calls), None);

        assert!(matches!(scheduler.start(SECOND), Err(SchedulerError::NoRuntime)));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}
