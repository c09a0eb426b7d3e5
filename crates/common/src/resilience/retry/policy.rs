//! Retry policy and the backoff schedule it produces

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::duration_millis;

/// A policy that cannot drive an execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid retry policy: {message}")]
pub struct InvalidPolicy {
    /// What is wrong
    pub message: String,
}

impl InvalidPolicy {
    fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }
}

/// Attempt budget and delay growth for one execution
///
/// The policy is copied into the executor and never mutated while an
/// execution runs. Delays serialize as milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one (>= 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    #[serde(rename = "initial_delay_ms", with = "duration_millis")]
    pub initial_delay: Duration,
    /// Ceiling for any single delay (>= `initial_delay`)
    #[serde(rename = "max_delay_ms", with = "duration_millis")]
    pub max_delay: Duration,
    /// Multiplier applied after every failed attempt (>= 1)
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy with every field given explicitly.
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_factor: f64,
    ) -> Self {
        Self { max_attempts, initial_delay, max_delay, backoff_factor }
    }

    /// Single attempt, never retried.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Replace the attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Replace the first delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Replace the delay ceiling.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Replace the growth factor.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Check the policy's invariants.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPolicy`] when `max_attempts` is zero, the ceiling is
    /// below the initial delay, or the factor is below 1 or not finite.
    pub fn validate(&self) -> Result<(), InvalidPolicy> {
        if self.max_attempts == 0 {
            return Err(InvalidPolicy::new("max_attempts must be at least 1"));
        }
        if self.max_delay < self.initial_delay {
            return Err(InvalidPolicy::new(format!(
                "max_delay ({:?}) must not be below initial_delay ({:?})",
                self.max_delay, self.initial_delay
            )));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(InvalidPolicy::new(format!(
                "backoff_factor must be a finite number >= 1, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }

    /// Delay sequence for this policy, starting with the delay that follows
    /// the first failed attempt.
    pub fn schedule(&self) -> BackoffSchedule {
        BackoffSchedule::new(self)
    }

    /// Delay slept before attempt `attempt + 1`, i.e. after `attempt` failures.
    ///
    /// Equals `min(initial_delay * factor^(attempt - 1), max_delay)` rounded
    /// to whole milliseconds. Returns zero for `attempt == 0`, which is never
    /// preceded by a delay.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match attempt {
            0 => Duration::ZERO,
            n => self.schedule().nth((n - 1) as usize).unwrap_or(self.max_delay),
        }
    }
}

/// Deterministic, non-jittered exponential delay sequence
///
/// Yields `initial_delay`, then `min(previous * factor, max_delay)` forever.
/// Growth is tracked in fractional milliseconds; each yielded delay is
/// rounded to the nearest whole millisecond, the timer's resolution.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    next_ms: f64,
    max_ms: f64,
    factor: f64,
}

impl BackoffSchedule {
    fn new(policy: &RetryPolicy) -> Self {
        let max_ms = policy.max_delay.as_secs_f64() * 1000.0;
        Self {
            next_ms: (policy.initial_delay.as_secs_f64() * 1000.0).min(max_ms),
            max_ms,
            factor: policy.backoff_factor,
        }
    }

    /// Current delay; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next_ms;
        self.next_ms = (current * self.factor).min(self.max_ms);
        millis_to_duration(current)
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_delay())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis_to_duration(ms: f64) -> Duration {
    if ms <= 0.0 || !ms.is_finite() {
        return Duration::ZERO;
    }
    Duration::from_millis(ms.round() as u64)
}
