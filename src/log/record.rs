use std::fmt;
use std::panic::Location;
use std::thread::{self, ThreadId};

use chrono::{DateTime, Local};
use serde::Deserialize;

/// Severity of a log record, from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Prod,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Prod => "Prod",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which severities a logger lets through.
///
/// Configured as an integer from `0` to `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "u8")]
pub enum SeverityFilter {
    /// Nothing is logged (`0`).
    NoLogs,
    /// `Prod`, `Warning` and `Error` (`1`).
    ProdWarnErr,
    /// Everything from `Debug` up (`2`).
    #[default]
    Debug,
    /// Everything (`3`).
    Trace,
}

impl SeverityFilter {
    /// Returns `true` if records of `level` pass this filter.
    pub fn allows(self, level: LogLevel) -> bool {
        match self {
            SeverityFilter::NoLogs => false,
            SeverityFilter::ProdWarnErr => level >= LogLevel::Prod,
            SeverityFilter::Debug => level >= LogLevel::Debug,
            SeverityFilter::Trace => true,
        }
    }

    /// Human-readable name of the filter.
    pub fn label(self) -> &'static str {
        match self {
            SeverityFilter::NoLogs => "",
            SeverityFilter::ProdWarnErr => "Prod/Warning/Error",
            SeverityFilter::Debug => "Debug",
            SeverityFilter::Trace => "Trace",
        }
    }
}

impl TryFrom<u8> for SeverityFilter {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SeverityFilter::NoLogs),
            1 => Ok(SeverityFilter::ProdWarnErr),
            2 => Ok(SeverityFilter::Debug),
            3 => Ok(SeverityFilter::Trace),
            other => Err(format!("log level must be between 0 and 3, got {other}")),
        }
    }
}

/// A single log message together with where and when it was produced.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub location: &'static Location<'static>,
    pub thread: ThreadId,
    pub timestamp: DateTime<Local>,
}

impl LogRecord {
    /// Captures a record for the caller's location on the current thread.
    #[track_caller]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            location: Location::caller(),
            thread: thread::current().id(),
            timestamp: Local::now(),
        }
    }
}

impl fmt::Display for LogRecord {
    /// `ThreadId(N) - dd/mm/YYYY HH:MM:SS.ffffff [Level] - [file:line] message`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} - {} [{}] - [{}:{}] {}",
            self.thread,
            self.timestamp.format("%d/%m/%Y %H:%M:%S%.6f"),
            self.level,
            self.location.file(),
            self.location.line(),
            self.message
        )
    }
}
