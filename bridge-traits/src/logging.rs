//! Host logging bridge.
//!
//! The core logs through `tracing`; a [`LoggerSink`] lets the host mirror
//! those events into its native pipeline (Logcat, os_log, a desktop file).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Target module, e.g. `core_playback::service`.
    pub target: String,
    pub message: String,
    /// Structured fields recorded on the event (`track_id`, `generation`, ...).
    pub fields: HashMap<String, String>,
    /// Name of the innermost active span, if any.
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    /// Short tag for hosts with tag-based loggers: the crate part of the
    /// target (`core_playback::service` becomes `core_playback`).
    pub fn tag(&self) -> &str {
        self.target.split("::").next().unwrap_or(&self.target)
    }
}

/// Logger sink trait
///
/// Forwards structured logs from the core to host logging pipelines:
/// - **Android**: Logcat, using [`LogEntry::tag`] as the tag
/// - **iOS**: OSLog
/// - **Desktop**: Console or file logs
///
/// Implementations must not log file paths verbatim in release builds; the
/// core already strips paths to their basename before logging them.
#[async_trait]
pub trait LoggerSink: Send + Sync {
    /// Forward a log entry to the host logging system
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush any buffered logs
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Entries below this level are dropped before reaching [`log`](Self::log).
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Stderr logger for development hosts and tests.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }

        eprintln!(
            "[{}] {} {}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level.as_str(),
            entry.tag(),
            entry.message
        );

        if !entry.fields.is_empty() {
            eprintln!("  Fields: {:?}", entry.fields);
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Info, "core_playback::service", "Track loaded")
            .with_field("track_id", "42")
            .with_span_id("load");

        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.tag(), "core_playback");
        assert_eq!(entry.message, "Track loaded");
        assert_eq!(entry.fields.get("track_id"), Some(&"42".to_string()));
        assert_eq!(entry.span_id, Some("load".to_string()));
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.as_str(), "WARN");
    }

    #[core_async::test]
    async fn test_console_logger_accepts_entries() {
        let logger = ConsoleLogger::default();
        let entry = LogEntry::new(LogLevel::Debug, "test", "filtered out");
        logger.log(entry).await.unwrap();

        let entry = LogEntry::new(LogLevel::Error, "test", "printed");
        logger.log(entry).await.unwrap();
    }
}
