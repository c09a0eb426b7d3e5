//! Bounded retry with deterministic exponential backoff
//!
//! An execution makes at most `max_attempts` attempts. After a failed
//! attempt `k` (1-based) that is not the last one, the executor notifies the
//! caller, then sleeps `min(initial_delay * factor^(k-1), max_delay)` before
//! attempt `k + 1`. The last failure is returned unchanged inside
//! [`RetryError::Exhausted`] without a further delay.
//!
//! Cancellation is cooperative: a [`CancellationToken`] is checked before
//! every attempt and raced against every backoff sleep. An attempt already in
//! flight runs to completion. Dropping the execution future has the same
//! effect, since nothing runs outside of it.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod condition;
mod error;
mod executor;
mod policy;

pub use condition::{policies, RetryCondition, RetryDecision};
pub use error::{RetryError, RetryResult};
pub use executor::{retry, retry_with_notify, RetryExecutor, RetryOutcome};
pub use policy::{BackoffSchedule, InvalidPolicy, RetryPolicy};
