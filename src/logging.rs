//! Caller-supplied diagnostics sink
//!
//! Library code never logs to a global logger on its own behalf; entry points
//! that produce diagnostics take a [`LogSink`]. The call site is captured at
//! compile time by [`log_to!`].

use std::fmt;
use std::sync::Mutex;

/// Severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic with its source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub file: &'static str,
    pub line: u32,
    /// Path of the enclosing module; Rust has no stable function-name macro
    pub module_path: &'static str,
}

impl LogRecord {
    pub fn new(
        level: Level,
        message: impl Into<String>,
        file: &'static str,
        line: u32,
        module_path: &'static str,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            file,
            line,
            module_path,
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}:{} {}: {}",
            self.level, self.file, self.line, self.module_path, self.message
        )
    }
}

/// Destination for diagnostics
pub trait LogSink {
    fn log(&self, record: &LogRecord);

    /// Whether records at `level` would be kept; lets callers skip formatting
    fn enabled(&self, _level: Level) -> bool {
        true
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _record: &LogRecord) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}

/// Forwards records to `tracing` events, keeping the captured call site as
/// fields. `Fatal` has no tracing counterpart and is emitted as an error
/// event with `fatal = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, r: &LogRecord) {
        match r.level {
            Level::Debug => tracing::debug!(
                file = r.file,
                line = r.line,
                module = r.module_path,
                "{}",
                r.message
            ),
            Level::Info => tracing::info!(
                file = r.file,
                line = r.line,
                module = r.module_path,
                "{}",
                r.message
            ),
            Level::Warn => tracing::warn!(
                file = r.file,
                line = r.line,
                module = r.module_path,
                "{}",
                r.message
            ),
            Level::Error => tracing::error!(
                file = r.file,
                line = r.line,
                module = r.module_path,
                "{}",
                r.message
            ),
            Level::Fatal => tracing::error!(
                fatal = true,
                file = r.file,
                line = r.line,
                module = r.module_path,
                "{}",
                r.message
            ),
        }
    }
}

/// Keeps records at or above `min_level` in memory
#[derive(Debug)]
pub struct MemorySink {
    min_level: Level,
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_min_level(Level::Debug)
    }

    pub fn with_min_level(min_level: Level) -> Self {
        Self {
            min_level,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the records kept so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemorySink {
    fn log(&self, record: &LogRecord) {
        if !self.enabled(record.level) {
            return;
        }
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
    }

    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }
}

/// Send a formatted record to a sink, capturing `file!()`, `line!()` and
/// `module_path!()` at the call site
///
/// ```
/// use quatstat::log_to;
/// use quatstat::logging::{Level, MemorySink};
///
/// let sink = MemorySink::new();
/// log_to!(&sink, Level::Info, "processed {} batches", 3);
/// assert_eq!(sink.records()[0].message, "processed 3 batches");
/// ```
#[macro_export]
macro_rules! log_to {
    ($sink:expr, $level:expr, $($arg:tt)+) => {{
        let sink = $sink;
        let level: $crate::logging::Level = $level;
        if $crate::logging::LogSink::enabled(sink, level) {
            $crate::logging::LogSink::log(
                sink,
                &$crate::logging::LogRecord::new(
                    level,
                    ::std::format!($($arg)+),
                    ::std::file!(),
                    ::std::line!(),
                    ::std::module_path!(),
                ),
            );
        }
    }};
}
