use std::fmt::Display;
use std::thread;
use std::time::Duration;

use backon::{BlockingRetryable, ExponentialBuilder};
use tracing::{debug, warn};

use crate::errors::FeederError;

/// Errors that may go away if the same request is simply repeated.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for FeederError {
    fn is_transient(&self) -> bool {
        match self {
            FeederError::Http(e) => e.is_timeout() || e.is_connect(),
            FeederError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl Transient for channels::ChannelError {
    fn is_transient(&self) -> bool {
        channels::ChannelError::is_transient(self)
    }
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Bounded retry with exponential backoff, applied per network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Backoff schedule between attempts: doubling from `base_delay`,
    /// capped at `max_delay`, `max_attempts - 1` sleeps in total.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Runs `op` until it succeeds, fails non-transiently, or the attempt
    /// ceiling is reached. The last error is returned.
    pub fn run<T, E, F>(&self, what: &str, op: F) -> Result<T, E>
    where
        E: Transient + Display,
        F: FnMut() -> Result<T, E>,
    {
        op.retry(self.backoff())
            .sleep(thread::sleep)
            .when(|e: &E| e.is_transient())
            .notify(|e: &E, delay: Duration| {
                debug!(what, ?delay, error = %e, "transient failure, retrying");
            })
            .call()
            .inspect_err(|e| {
                if e.is_transient() {
                    warn!(what, attempts = self.max_attempts, error = %e, "giving up after retries");
                }
            })
    }
}
