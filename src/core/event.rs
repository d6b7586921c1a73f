//! Log event construction and call-site capture

use crate::core::level::LogLevel;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Call site of a log statement.
///
/// `file` and `function` default to empty when the event was not produced
/// through the logging macros (configuration-driven or manual dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: &'static str,
    pub function: &'static str,
    pub line: u32,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: &'static str, function: &'static str, line: u32) -> Self {
        Self {
            file,
            function,
            line,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }

    /// File name with any leading directories stripped.
    #[must_use]
    pub fn short_file(&self) -> &'static str {
        match self.file.rfind(['/', '\\']) {
            Some(pos) => &self.file[pos + 1..],
            None => self.file,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} in {}", self.short_file(), self.line, self.function)
    }
}

/// Identity of the calling thread, captured once per thread and cached.
#[derive(Debug, Clone)]
pub struct ThreadIdentity {
    pub id: u64,
    pub name: Option<String>,
}

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_IDENTITY: ThreadIdentity = ThreadIdentity {
        id: NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed),
        name: std::thread::current().name().map(str::to_owned),
    };
}

/// Cached identity of the current thread. No syscalls after the first call
/// on a given thread.
#[must_use]
pub fn thread_identity() -> ThreadIdentity {
    THREAD_IDENTITY.with(Clone::clone)
}

/// One log call, snapshotted at dispatch time.
///
/// The message is settable exactly once after construction (lazy message
/// producers run after the level gate); everything else is captured in
/// `new`. Once the event is wrapped in an `Arc` and handed to the sinks it
/// is immutable.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    pub logger_name: String,
    pub timestamp: DateTime<Utc>,
    pub thread_id: u64,
    pub thread_name: Option<String>,
    pub location: SourceLocation,
    message: String,
}

impl LogEvent {
    /// Create an event with an empty message; the timestamp and thread
    /// identity are captured here.
    #[must_use]
    pub fn new(level: LogLevel, logger_name: impl Into<String>, location: SourceLocation) -> Self {
        let identity = thread_identity();
        Self {
            level,
            logger_name: logger_name.into(),
            timestamp: Utc::now(),
            thread_id: identity.id,
            thread_name: identity.name,
            location,
            message: String::new(),
        }
    }

    /// Create an event carrying `message`.
    #[must_use]
    pub fn with_message(
        level: LogLevel,
        logger_name: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        let mut event = Self::new(level, logger_name, location);
        event.message = message.into();
        event
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Sub-second milliseconds of the timestamp, for the `%ms` directive.
    #[must_use]
    pub fn milliseconds(&self) -> u32 {
        self.timestamp.timestamp_subsec_millis()
    }
}
