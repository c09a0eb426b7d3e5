//! Testing utilities and helpers
//!
//! - **[`mocks`]**: a [`Logger`](crate::observability::Logger) that records
//!   what it receives, and a scripted operation for driving the backoff
//!   executor through a fixed sequence of outcomes
//!
//! ## Usage
//!
//! ```rust
//! use castkit_common::observability::{LogLevel, Logger};
//! use castkit_common::testing::RecordingLogger;
//!
//! let logger = RecordingLogger::new();
//! logger.warn("API request retry 1", None);
//!
//! assert_eq!(logger.levels(), vec![LogLevel::Warn]);
//! assert!(logger.contains("retry 1"));
//! ```

pub mod mocks;

pub use mocks::{LogRecord, RecordingLogger, ScriptedOperation};
