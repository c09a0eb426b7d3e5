use std::time::Duration;

/// Per-error decision on whether the loop keeps going
pub trait RetryCondition<E> {
    /// Decide for the failure of `attempt` (1-based).
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Outcome of a [`RetryCondition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the next scheduled backoff delay
    Retry,
    /// Retry after this delay instead of the scheduled one
    RetryAfter(Duration),
    /// Stop and surface the error
    Stop,
}

/// Built-in retry conditions
pub mod policies {
    use super::{RetryCondition, RetryDecision};
    use crate::error::ErrorClassification;

    /// Retries every error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryCondition<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retries
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<E> RetryCondition<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Retries while a predicate over the error and attempt holds
    #[derive(Debug, Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        /// Wrap `predicate`.
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryCondition<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }

    /// Retries errors that classify themselves as transient
    ///
    /// Honors [`ErrorClassification::retry_after`] when the error carries a
    /// server-provided delay.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RetryTransient;

    impl<E: ErrorClassification> RetryCondition<E> for RetryTransient {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if !error.is_retryable() {
                return RetryDecision::Stop;
            }
            match error.retry_after() {
                Some(delay) => RetryDecision::RetryAfter(delay),
                None => RetryDecision::Retry,
            }
        }
    }
}
