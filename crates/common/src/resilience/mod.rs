//! Resilience patterns for transient failures
//!
//! This module provides the **backoff executor**: a bounded retry loop with
//! deterministic multiplicative backoff and a ceiling delay, generic over the
//! operation's success and error types.
//!
//! - [`RetryPolicy`]: attempt budget and delay growth, supplied per execution
//! - [`BackoffSchedule`]: the delay sequence a policy produces
//! - [`RetryCondition`]: per-error decision to keep going or stop
//! - [`RetryExecutor`]: runs an operation under a policy and a condition
//!
//! Suspension between attempts uses `tokio::time::sleep`, so waiting never
//! blocks other tasks on the runtime.

pub mod retry;

pub use retry::{
    policies, retry, retry_with_notify, BackoffSchedule, InvalidPolicy, RetryCondition,
    RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
};
