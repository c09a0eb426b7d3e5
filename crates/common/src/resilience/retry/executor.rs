use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::condition::policies::AlwaysRetry;
use super::condition::{RetryCondition, RetryDecision};
use super::error::{RetryError, RetryResult};
use super::policy::RetryPolicy;
use crate::observability::{metadata, LogLevel, Logger, Metadata, TracingLogger};

/// Result of an execution together with its statistics
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Value or terminal error
    pub result: RetryResult<T, E>,
    /// Attempts made
    pub attempts: u32,
    /// Time spent sleeping between attempts
    pub total_delay: Duration,
    /// Wall time from the first attempt to completion
    pub elapsed: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Average delay between attempts.
    pub fn average_delay(&self) -> Duration {
        if self.attempts <= 1 {
            return Duration::ZERO;
        }
        self.total_delay / (self.attempts - 1)
    }
}

/// Runs an operation under a [`RetryPolicy`] and a [`RetryCondition`]
///
/// The executor holds no per-execution state; one instance can drive any
/// number of concurrent executions.
///
/// ```rust
/// use std::time::Duration;
/// use castkit_common::resilience::{RetryExecutor, RetryPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::default().with_initial_delay(Duration::ZERO);
/// let executor = RetryExecutor::new(policy);
///
/// let value = executor.execute(|| async { Ok::<_, String>(42) }).await.unwrap();
/// assert_eq!(value, 42);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryExecutor<C = AlwaysRetry> {
    policy: RetryPolicy,
    condition: C,
    logger: Arc<dyn Logger>,
    context: Metadata,
    cancel: Option<CancellationToken>,
}

impl RetryExecutor<AlwaysRetry> {
    /// Executor that retries every error under `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            condition: AlwaysRetry,
            logger: Arc::new(TracingLogger::new(LogLevel::Debug).with_prefix("retry")),
            context: Metadata::new(),
            cancel: None,
        }
    }
}

impl<C> RetryExecutor<C> {
    /// Replace the retry condition.
    pub fn with_condition<N>(self, condition: N) -> RetryExecutor<N> {
        RetryExecutor {
            policy: self.policy,
            condition,
            logger: self.logger,
            context: self.context,
            cancel: self.cancel,
        }
    }

    /// Report retries and terminal failures to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Metadata attached to every record this executor logs.
    #[must_use]
    pub fn with_context(mut self, context: Metadata) -> Self {
        self.context = context;
        self
    }

    /// Stop scheduling attempts once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Policy driving this executor
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation`, retrying failures per policy and condition.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`RetryError`], which carries the last operation
    /// error unchanged.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        C: RetryCondition<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation, |_: &E, _| {}).await.into_result()
    }

    /// Like [`execute`](Self::execute), calling `on_retry(error, attempt)`
    /// before each backoff sleep. `attempt` is the 1-based number of the
    /// attempt that just failed.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_with_notify<F, Fut, T, E, N>(
        &self,
        operation: F,
        on_retry: N,
    ) -> RetryResult<T, E>
    where
        C: RetryCondition<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        N: FnMut(&E, u32),
    {
        self.execute_with_outcome(operation, on_retry).await.into_result()
    }

    /// Execute and return the result along with attempt statistics.
    #[instrument(skip_all, fields(max_attempts = self.policy.max_attempts))]
    pub async fn execute_with_outcome<F, Fut, T, E, N>(
        &self,
        mut operation: F,
        mut on_retry: N,
    ) -> RetryOutcome<T, E>
    where
        C: RetryCondition<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        N: FnMut(&E, u32),
    {
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut total_delay = Duration::ZERO;
        let mut last_error: Option<E> = None;

        let finish = |result: RetryResult<T, E>, attempts: u32, total_delay: Duration| RetryOutcome {
            result,
            attempts,
            total_delay,
            elapsed: started.elapsed(),
        };

        if let Err(invalid) = self.policy.validate() {
            self.logger.error(&invalid.to_string(), self.record(&[]).as_ref());
            return finish(Err(RetryError::InvalidPolicy(invalid)), 0, total_delay);
        }

        let mut schedule = self.policy.schedule();

        loop {
            if self.is_cancelled() {
                self.logger.info(
                    "retry cancelled before next attempt",
                    self.record(&[("attempts", json!(attempts))]).as_ref(),
                );
                return finish(Err(RetryError::Cancelled { attempts, last_error }), attempts, total_delay);
            }

            attempts += 1;
            let error = match operation().await {
                Ok(value) => return finish(Ok(value), attempts, total_delay),
                Err(error) => error,
            };

            if attempts >= self.policy.max_attempts {
                self.logger.error(
                    "all retry attempts exhausted",
                    self.record(&[("attempts", json!(attempts)), ("error", json!(error.to_string()))])
                        .as_ref(),
                );
                return finish(Err(RetryError::Exhausted { attempts, source: error }), attempts, total_delay);
            }

            let scheduled = schedule.next_delay();
            let delay = match self.condition.should_retry(&error, attempts) {
                RetryDecision::Retry => scheduled,
                RetryDecision::RetryAfter(delay) => delay,
                RetryDecision::Stop => {
                    self.logger.error(
                        "operation failed with non-retryable error",
                        self.record(&[
                            ("attempts", json!(attempts)),
                            ("error", json!(error.to_string())),
                        ])
                        .as_ref(),
                    );
                    return finish(
                        Err(RetryError::NonRetryable { attempts, source: error }),
                        attempts,
                        total_delay,
                    );
                }
            };

            on_retry(&error, attempts);
            self.logger.warn(
                &format!("attempt {attempts} failed, retrying"),
                self.record(&[
                    ("attempt", json!(attempts)),
                    ("delay_ms", json!(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))),
                    ("error", json!(error.to_string())),
                ])
                .as_ref(),
            );
            last_error = Some(error);

            if !self.pause(delay).await {
                self.logger.info(
                    "retry cancelled during backoff",
                    self.record(&[("attempts", json!(attempts))]).as_ref(),
                );
                return finish(Err(RetryError::Cancelled { attempts, last_error }), attempts, total_delay);
            }
            total_delay += delay;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Sleep for `delay`; false when cancellation interrupted the sleep.
    async fn pause(&self, delay: Duration) -> bool {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = tokio::time::sleep(delay) => true,
            },
            None => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                true
            }
        }
    }

    fn record(&self, fields: &[(&str, serde_json::Value)]) -> Option<Metadata> {
        let mut record = self.context.clone();
        record.extend(metadata(fields.iter().map(|(k, v)| (*k, v.clone()))));
        Some(record)
    }
}

/// Execute `operation` under `policy`, retrying every error.
///
/// # Errors
///
/// Returns the terminal [`RetryError`] once the attempt budget is spent.
pub async fn retry<F, Fut, T, E>(operation: F, policy: RetryPolicy) -> RetryResult<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryExecutor::new(policy).execute(operation).await
}

/// [`retry`] with a notification before each backoff sleep.
///
/// # Errors
///
/// Returns the terminal [`RetryError`] once the attempt budget is spent.
pub async fn retry_with_notify<F, Fut, T, E, N>(
    operation: F,
    policy: RetryPolicy,
    on_retry: N,
) -> RetryResult<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    N: FnMut(&E, u32),
{
    RetryExecutor::new(policy).execute_with_notify(operation, on_retry).await
}
