use std::time::Duration;

const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// What the loop does when a tick cannot obtain its sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SamplingFailurePolicy {
    /// Report the error and stop producing samples.
    #[default]
    Halt,
    /// Report the error, wait with exponential backoff and sample again.
    /// `max_attempts` bounds consecutive retries; past it the loop halts.
    Retry {
        initial_backoff: Duration,
        max_backoff: Duration,
        max_attempts: Option<u32>,
    },
}

impl SamplingFailurePolicy {
    pub(crate) fn backoff(&self) -> Option<Backoff> {
        match self {
            SamplingFailurePolicy::Halt => None,
            SamplingFailurePolicy::Retry {
                initial_backoff,
                max_backoff,
                max_attempts,
            } => Some(Backoff::new(*initial_backoff, *max_backoff, *max_attempts)),
        }
    }
}

/// Tracks consecutive sampling failures and the delay before the next attempt.
#[derive(Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
    failures: u32,
    max_attempts: Option<u32>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, max_attempts: Option<u32>) -> Self {
        let initial = initial.max(MIN_BACKOFF);
        Self {
            initial,
            max: max.max(initial),
            current: initial,
            failures: 0,
            max_attempts,
        }
    }

    /// Record a failure. Returns the delay before retrying, or `None` once
    /// the retry budget is spent.
    pub fn mark_failure(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if matches!(self.max_attempts, Some(max) if self.failures > max) {
            return None;
        }
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        Some(delay)
    }

    pub fn mark_success(&mut self) {
        self.current = self.initial;
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
