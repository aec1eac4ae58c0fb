//! Per-request retry policy
//!
//! Every fetch attempt, the first one included, is preceded by a delay of
//! `delay + random(0, jitter_fraction) * delay`. After a failed attempt the
//! request is retried while the number of attempts made so far does not exceed
//! `retry_limit`, so a request is attempted at most `retry_limit + 1` times.
//!
//! # Example
//!
//! ```
//! use sumi_crawl::crawler::{RetryDecision, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(1, Duration::ZERO, 0.5);
//! assert!(matches!(policy.decide(1), RetryDecision::Retry { next_attempt: 2 }));
//! assert!(matches!(policy.decide(2), RetryDecision::GiveUp { attempts: 2 }));
//! ```

use crate::config::CrawlerSettings;
use rand::Rng;
use std::time::Duration;

/// Decision after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempt the same request again
    Retry {
        /// 1-indexed number of the attempt about to be made
        next_attempt: u32,
    },

    /// Abandon the request
    GiveUp {
        /// Total attempts made
        attempts: u32,
    },
}

/// Fixed-delay retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    retry_limit: u32,
    delay: Duration,
    jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&CrawlerSettings::default())
    }
}

impl RetryPolicy {
    /// Creates a policy
    ///
    /// A negative or non-finite `jitter_fraction` disables jitter.
    pub fn new(retry_limit: u32, delay: Duration, jitter_fraction: f64) -> Self {
        let jitter_fraction = if jitter_fraction.is_finite() && jitter_fraction > 0.0 {
            jitter_fraction
        } else {
            0.0
        };

        Self {
            retry_limit,
            delay,
            jitter_fraction,
        }
    }

    /// Builds the policy from validated engine settings
    ///
    /// A delay too large for a `Duration` saturates instead of panicking.
    pub fn from_settings(settings: &CrawlerSettings) -> Self {
        let delay = Duration::try_from_secs_f64(settings.delay_seconds.max(0.0))
            .unwrap_or(Duration::MAX);
        Self::new(settings.retry_limit, delay, settings.delay_jitter_fraction)
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Maximum number of attempts for one request
    pub fn max_attempts(&self) -> u32 {
        self.retry_limit.saturating_add(1)
    }

    pub fn base_delay(&self) -> Duration {
        self.delay
    }

    /// Upper bound of the delay applied before an attempt
    pub fn max_delay(&self) -> Duration {
        self.delay.saturating_add(scaled(self.delay, self.jitter_fraction))
    }

    /// Delay to sleep before the next attempt
    pub fn attempt_delay(&self) -> Duration {
        if self.delay.is_zero() {
            return Duration::ZERO;
        }
        if self.jitter_fraction == 0.0 {
            return self.delay;
        }

        let factor = rand::thread_rng().gen_range(0.0..=self.jitter_fraction);
        self.delay.saturating_add(scaled(self.delay, factor))
    }

    /// Decides what to do after attempt number `attempts_so_far` (1-indexed) failed
    pub fn decide(&self, attempts_so_far: u32) -> RetryDecision {
        if attempts_so_far <= self.retry_limit {
            RetryDecision::Retry {
                next_attempt: attempts_so_far + 1,
            }
        } else {
            RetryDecision::GiveUp {
                attempts: attempts_so_far,
            }
        }
    }
}

/// `delay * factor`, saturating at `Duration::MAX`
fn scaled(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}
