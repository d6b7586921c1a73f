//! Log severity levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log event, ordered from most to least verbose.
///
/// `Off` is a threshold-only value: a logger whose threshold is `Off`
/// publishes nothing, and events themselves are never created at `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
    Off = 6,
}

impl LogLevel {
    /// Upper-case name, as rendered by the `%p` pattern directive.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
            LogLevel::Off => "OFF",
        }
    }

    /// Whether an event at this level passes a logger threshold.
    ///
    /// Events at `Off` never pass; a threshold of `Off` blocks everything.
    #[must_use]
    pub fn is_enabled_for(self, threshold: LogLevel) -> bool {
        self != LogLevel::Off && self >= threshold
    }

    /// Lenient parse: unknown strings fall back to `Info`.
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        s.parse().unwrap_or(LogLevel::Info)
    }

    /// Terminal color associated with this level.
    #[cfg(feature = "console")]
    #[must_use]
    pub fn color(&self) -> colored::Color {
        match self {
            LogLevel::Trace => colored::Color::White,
            LogLevel::Debug => colored::Color::Cyan,
            LogLevel::Info => colored::Color::Green,
            LogLevel::Warn => colored::Color::Yellow,
            LogLevel::Error => colored::Color::Red,
            LogLevel::Fatal | LogLevel::Off => colored::Color::Magenta,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" | "critical" => Ok(LogLevel::Fatal),
            "off" => Ok(LogLevel::Off),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}
