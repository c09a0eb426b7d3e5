//! Mock implementations of common traits
//!
//! Provides mock objects for testing purposes.

#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::observability::{LogLevel, Logger, Metadata};

/// A captured log record
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Level it was logged at
    pub level: LogLevel,
    /// Message text
    pub message: String,
    /// Metadata, empty when none was given
    pub metadata: Metadata,
}

impl LogRecord {
    /// Metadata value for `key`.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Logger that keeps every record in memory
///
/// Clones share the same buffer, so a clone can be handed to the code under
/// test while the original is used for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl RecordingLogger {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        // Poisoning only happens after a panicking test, keep the data anyway
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Levels of the recorded messages, in order.
    #[must_use]
    pub fn levels(&self) -> Vec<LogLevel> {
        self.records().into_iter().map(|record| record.level).collect()
    }

    /// Records at `level`.
    #[must_use]
    pub fn at(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records().into_iter().filter(|record| record.level == level).collect()
    }

    /// True when some message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|record| record.message.contains(needle))
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str, metadata: Option<&Metadata>) {
        let record = LogRecord {
            level,
            message: message.to_string(),
            metadata: metadata.cloned().unwrap_or_default(),
        };
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record);
    }
}

/// Operation that replays a fixed script of outcomes
///
/// Each call pops the next outcome. Once the script runs out, the last
/// outcome repeats. Clones share the script and the call counter.
///
/// ```rust
/// use castkit_common::testing::ScriptedOperation;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let op = ScriptedOperation::new([Err("down"), Ok(7)]);
/// assert_eq!(op.call().await, Err("down"));
/// assert_eq!(op.call().await, Ok(7));
/// assert_eq!(op.call().await, Ok(7));
/// assert_eq!(op.calls(), 3);
/// # }
/// ```
#[derive(Debug)]
pub struct ScriptedOperation<T, E> {
    script: Arc<Mutex<VecDeque<Result<T, E>>>>,
    calls: Arc<AtomicU32>,
}

impl<T, E> Clone for ScriptedOperation<T, E> {
    fn clone(&self) -> Self {
        Self { script: Arc::clone(&self.script), calls: Arc::clone(&self.calls) }
    }
}

impl<T: Clone, E: Clone> ScriptedOperation<T, E> {
    /// Script of outcomes to replay, in order.
    pub fn new<I: IntoIterator<Item = Result<T, E>>>(script: I) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Fails `failures` times with `error`, then succeeds with `value`.
    pub fn failing_then(failures: usize, error: E, value: T) -> Self {
        Self::new(std::iter::repeat(Err(error)).take(failures).chain(std::iter::once(Ok(value))))
    }

    /// Produce the next outcome.
    ///
    /// # Errors
    ///
    /// Returns the scripted error when the next outcome is one.
    pub async fn call(&self) -> Result<T, E> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        let next = if script.len() > 1 { script.pop_front() } else { script.front().cloned() };
        match next {
            Some(outcome) => outcome,
            None => panic!("ScriptedOperation called with an empty script"),
        }
    }

    /// Number of calls so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}
