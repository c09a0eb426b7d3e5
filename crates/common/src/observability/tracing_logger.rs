//! [`Logger`] implementation backed by `tracing`

use std::fmt;

use super::{LogLevel, Logger, Metadata};

/// Forwards log records to the global `tracing` dispatcher.
///
/// Records below `min_level` are dropped before reaching `tracing`, so a
/// component can be quieter than the subscriber's own filter. The prefix is
/// recorded as a `prefix` field and the metadata as a JSON `metadata` field.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    min_level: LogLevel,
    prefix: Option<String>,
}

impl TracingLogger {
    /// Logger passing everything at or above `min_level`.
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level, prefix: None }
    }

    /// Same logger with a prefix.
    #[must_use]
    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Child logger; prefixes nest as `parent:child`.
    pub fn child(&self, prefix: &str) -> Self {
        let prefix = match &self.prefix {
            Some(parent) => format!("{parent}:{prefix}"),
            None => prefix.to_string(),
        };
        Self { min_level: self.min_level, prefix: Some(prefix) }
    }

    /// Threshold below which records are dropped
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Current prefix
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

/// Renders metadata as compact JSON only when the event is actually emitted.
struct JsonMetadata<'a>(&'a Metadata);

impl fmt::Display for JsonMetadata<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}

macro_rules! emit {
    ($event:ident, $prefix:expr, $metadata:expr, $message:expr) => {
        match $metadata {
            Some(meta) => tracing::$event!(
                prefix = $prefix,
                metadata = %JsonMetadata(meta),
                "{}",
                $message
            ),
            None => tracing::$event!(prefix = $prefix, "{}", $message),
        }
    };
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, metadata: Option<&Metadata>) {
        if !level.enabled_at(self.min_level) {
            return;
        }

        let prefix = self.prefix.as_deref().unwrap_or_default();
        let metadata = metadata.filter(|meta| !meta.is_empty());
        match level {
            LogLevel::Debug => emit!(debug, prefix, metadata, message),
            LogLevel::Info => emit!(info, prefix, metadata, message),
            LogLevel::Warn => emit!(warn, prefix, metadata, message),
            LogLevel::Error => emit!(error, prefix, metadata, message),
        }
    }
}
