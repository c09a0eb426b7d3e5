//! Observability primitives: the leveled logging capability
//!
//! Components never reach for a process-wide logger. They receive an
//! `Arc<dyn Logger>` at construction and report through it, which keeps
//! them testable with [`crate::testing::RecordingLogger`].
//!
//! - [`traits`]: the [`Logger`] trait, [`Metadata`] and [`NoOpLogger`]
//! - [`level`]: [`LogLevel`] ordering and parsing
//! - [`tracing_logger`]: [`TracingLogger`], forwarding to `tracing`

pub mod level;
pub mod tracing_logger;
pub mod traits;

pub use level::LogLevel;
pub use tracing_logger::TracingLogger;
pub use traits::{metadata, Logger, Metadata, NoOpLogger};
