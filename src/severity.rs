use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Severity labels understood by Cloud Logging.
///
/// These replace numeric levels in the emitted JSON. The formatter renders
/// anything outside this set with the `DEFAULT` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

/// Label written for severities that are missing or not recognized.
pub const DEFAULT_LABEL: &str = "DEFAULT";

/// Static severity -> label table, read-only after startup.
pub static SEVERITY_LABELS: [(Severity, &str); 8] = [
    (Severity::Debug, "DEBUG"),
    (Severity::Info, "INFO"),
    (Severity::Notice, "NOTICE"),
    (Severity::Warning, "WARNING"),
    (Severity::Error, "ERROR"),
    (Severity::Critical, "CRITICAL"),
    (Severity::Alert, "ALERT"),
    (Severity::Emergency, "EMERGENCY"),
];

impl Severity {
    pub fn label(self) -> &'static str {
        SEVERITY_LABELS[self as usize].1
    }

    /// Parse an upper-case label as found in a log line.
    pub fn from_label(label: &str) -> Option<Self> {
        SEVERITY_LABELS
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(s, _)| *s)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Logging levels with their numeric values.
///
/// Levels are ordered by value; a logger emits a record when the record's
/// level is greater than or equal to its threshold. `Trace` has no severity
/// label of its own and is written as `DEBUG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace = 10,
    Debug = 20,
    Info = 30,
    Notice = 35,
    Warn = 40,
    Error = 50,
    Critical = 60,
    Alert = 70,
    Emergency = 80,
}

impl Level {
    pub const ALL: [Level; 9] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warn,
        Level::Error,
        Level::Critical,
        Level::Alert,
        Level::Emergency,
    ];

    pub fn value(self) -> u32 {
        self as u32
    }

    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.value() == value)
    }

    pub fn severity(self) -> Severity {
        match self {
            Level::Trace | Level::Debug => Severity::Debug,
            Level::Info => Severity::Info,
            Level::Notice => Severity::Notice,
            Level::Warn => Severity::Warning,
            Level::Error => Severity::Error,
            Level::Critical => Severity::Critical,
            Level::Alert => Severity::Alert,
            Level::Emergency => Severity::Emergency,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Notice => "notice",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Critical => "critical",
            Level::Alert => "alert",
            Level::Emergency => "emergency",
        }
    }
}

impl From<Severity> for Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => Level::Debug,
            Severity::Info => Level::Info,
            Severity::Notice => Level::Notice,
            Severity::Warning => Level::Warn,
            Severity::Error => Level::Error,
            Severity::Critical => Level::Critical,
            Severity::Alert => Level::Alert,
            Severity::Emergency => Level::Emergency,
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Threshold below which records are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFilter {
    Level(Level),
    Silent,
}

impl LevelFilter {
    pub fn enabled(self, level: Level) -> bool {
        match self {
            LevelFilter::Level(min) => level >= min,
            LevelFilter::Silent => false,
        }
    }

    /// Closest `tracing` filter; NOTICE collapses into INFO and everything
    /// above ERROR into ERROR.
    pub fn to_tracing(self) -> tracing_subscriber::filter::LevelFilter {
        use tracing_subscriber::filter::LevelFilter as Tracing;
        match self {
            LevelFilter::Silent => Tracing::OFF,
            LevelFilter::Level(level) => match level {
                Level::Trace => Tracing::TRACE,
                Level::Debug => Tracing::DEBUG,
                Level::Info | Level::Notice => Tracing::INFO,
                Level::Warn => Tracing::WARN,
                _ => Tracing::ERROR,
            },
        }
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        LevelFilter::Level(Level::Info)
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        LevelFilter::Level(level)
    }
}

impl FromStr for LevelFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "notice" => Level::Notice,
            "warn" | "warning" => Level::Warn,
            "error" => Level::Error,
            "critical" | "fatal" => Level::Critical,
            "alert" => Level::Alert,
            "emergency" => Level::Emergency,
            "silent" | "off" => return Ok(LevelFilter::Silent),
            other => return Err(Error::InvalidLevel(other.to_string())),
        };
        Ok(LevelFilter::Level(level))
    }
}
