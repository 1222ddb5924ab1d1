//! Bounded retry inside one tick.
//!
//! A cycle moves `Idle -> Fetching -> (Fresh | Backoff -> Fetching ...)`
//! until a fresh value arrives or the attempt budget runs out. Stale results
//! and transport failures draw from the same budget.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::errors::{AttemptError, PollerError};
use crate::fetch::{Fetcher, SegmentStamped};
use crate::gate::FreshnessGate;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts every fetch of a cycle, the first one included.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, PollerError> {
        if max_attempts == 0 {
            return Err(PollerError::InvalidRetryPolicy(
                "max_attempts must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching { attempt: u32 },
    Backoff { attempt: u32 },
    Fresh { attempts: u32 },
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    RetryAfter(Duration),
    Exhausted,
}

/// Attempt counter for one cycle. Created per tick and dropped with it.
#[derive(Debug, Clone)]
pub struct AttemptBudget {
    policy: RetryPolicy,
    attempts: u32,
    phase: CyclePhase,
}

impl AttemptBudget {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            phase: CyclePhase::Idle,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Enter `Fetching` and return the 1-based attempt number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.phase = CyclePhase::Fetching {
            attempt: self.attempts,
        };
        self.attempts
    }

    pub fn record_fresh(&mut self) {
        self.phase = CyclePhase::Fresh {
            attempts: self.attempts,
        };
    }

    pub fn record_failure(&mut self) -> NextStep {
        if self.attempts >= self.policy.max_attempts {
            self.phase = CyclePhase::Exhausted {
                attempts: self.attempts,
            };
            NextStep::Exhausted
        } else {
            self.phase = CyclePhase::Backoff {
                attempt: self.attempts,
            };
            NextStep::RetryAfter(self.policy.delay)
        }
    }
}

/// How a cycle resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome<V> {
    Fresh { value: V, attempts: u32 },
    /// Every attempt was stale or failed; the consumer keeps the cached value.
    Exhausted { attempts: u32, last_error: AttemptError },
}

/// One tick's fetch-and-retry run.
///
/// Cancelled by dropping the future returned from [`RetryCycle::run`]; an
/// in-flight fetch or pending backoff is dropped with it.
pub struct RetryCycle<F: Fetcher> {
    fetcher: Arc<F>,
    clock: Arc<dyn Clock>,
    gate: FreshnessGate,
    budget: AttemptBudget,
}

impl<F> RetryCycle<F>
where
    F: Fetcher,
    F::Value: SegmentStamped,
{
    pub fn new(
        fetcher: Arc<F>,
        clock: Arc<dyn Clock>,
        gate: FreshnessGate,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            clock,
            gate,
            budget: AttemptBudget::new(policy),
        }
    }

    pub async fn run(mut self) -> CycleOutcome<F::Value> {
        loop {
            let attempt = self.budget.begin_attempt();

            let result = match self.fetcher.fetch().await {
                Ok(value) => self.gate.check(value, self.clock.now()),
                Err(e) => Err(AttemptError::from(e)),
            };

            let error = match result {
                Ok(value) => {
                    self.budget.record_fresh();
                    return CycleOutcome::Fresh {
                        value,
                        attempts: attempt,
                    };
                }
                Err(e) => e,
            };

            match self.budget.record_failure() {
                NextStep::RetryAfter(delay) => {
                    debug!(
                        event = "core.retry.attempt_failed",
                        attempt,
                        code = error.error_code(),
                        error = %error,
                        retry_in_secs = delay.as_secs(),
                    );
                    tokio::time::sleep(delay).await;
                }
                NextStep::Exhausted => {
                    warn!(
                        event = "core.retry.exhausted",
                        attempts = attempt,
                        code = error.error_code(),
                        error = %error,
                    );
                    return CycleOutcome::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    };
                }
            }
        }
    }
}
