//! Logger dispatch
//!
//! A `Logger` is a named dispatch point: it gates on level, builds the
//! event, runs the filter chain, and fans out to every attached appender on
//! the calling thread. Slow or failing appenders affect caller latency
//! directly; wrap them in an [`AsyncAppender`](crate::appenders::AsyncAppender)
//! when that matters.
//!
//! Appender and filter lists are snapshotted before use, so attaching or
//! removing components from another thread never races with an in-flight
//! dispatch.

use crate::core::appender::Appender;
use crate::core::event::{LogEvent, SourceLocation};
use crate::core::level::LogLevel;
use crate::core::stats::stats;
use crate::filters::{evaluate_chain, Filter, FilterDecision};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Logger {
    name: String,
    level: RwLock<LogLevel>,
    appenders: RwLock<Vec<Arc<dyn Appender>>>,
    filters: RwLock<Vec<Arc<dyn Filter>>>,
    stats_enabled: AtomicBool,
}

impl Logger {
    /// Create a logger with no appenders, no filters, and an `Info`
    /// threshold. Loggers obtained through the registry inherit their
    /// threshold instead (see `core::registry`).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: RwLock::new(LogLevel::Info),
            appenders: RwLock::new(Vec::new()),
            filters: RwLock::new(Vec::new()),
            stats_enabled: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        *self.level.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.level.write() = level;
    }

    /// Whether a call at `level` would pass the threshold gate. This is the
    /// entire cost of a disabled log call.
    #[must_use]
    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        level.is_enabled_for(*self.level.read())
    }

    pub fn add_appender(&self, appender: Arc<dyn Appender>) {
        self.appenders.write().push(appender);
    }

    /// Detach the first appender whose name matches. Returns whether one
    /// was removed.
    pub fn remove_appender(&self, name: &str) -> bool {
        let mut appenders = self.appenders.write();
        match appenders.iter().position(|a| a.name() == name) {
            Some(index) => {
                appenders.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear_appenders(&self) {
        self.appenders.write().clear();
    }

    /// Point-in-time copy of the appender list, in registration order.
    #[must_use]
    pub fn appenders(&self) -> Vec<Arc<dyn Appender>> {
        self.appenders.read().clone()
    }

    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filters.write().push(filter);
    }

    pub fn clear_filters(&self) {
        self.filters.write().clear();
    }

    #[must_use]
    pub fn filters(&self) -> Vec<Arc<dyn Filter>> {
        self.filters.read().clone()
    }

    pub fn set_statistics_enabled(&self, enabled: bool) {
        self.stats_enabled.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn statistics_enabled(&self) -> bool {
        self.stats_enabled.load(Ordering::Acquire)
    }

    /// Log a message with no call-site information. The logging macros use
    /// [`log_at`](Logger::log_at) and fill the call-site in.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_at(level, message, SourceLocation::default());
    }

    pub fn log_at(&self, level: LogLevel, message: impl Into<String>, location: SourceLocation) {
        if !self.is_enabled_for(level) {
            return;
        }
        let event = LogEvent::with_message(level, self.name.clone(), message, location);
        self.dispatch(&Arc::new(event));
    }

    /// Log with a message producer that only runs if the level gate passes.
    /// Use this when building the message is expensive.
    pub fn log_with<F>(&self, level: LogLevel, location: SourceLocation, message: F)
    where
        F: FnOnce() -> String,
    {
        if !self.is_enabled_for(level) {
            return;
        }
        let mut event = LogEvent::new(level, self.name.clone(), location);
        event.set_message(message());
        self.dispatch(&Arc::new(event));
    }

    fn dispatch(&self, event: &Arc<LogEvent>) {
        let filters = self.filters();
        if evaluate_chain(&filters, event) == FilterDecision::Deny {
            return;
        }

        if self.statistics_enabled() {
            stats().record_event(&event.logger_name, event.level, event.message().len());
        }

        for appender in self.appenders() {
            match catch_unwind(AssertUnwindSafe(|| appender.append(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    eprintln!("[LOGGER ERROR] Appender '{}' failed: {}", appender.name(), err);
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_owned())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_owned());
                    eprintln!(
                        "[LOGGER ERROR] Appender '{}' panicked: {}. \
                         Remaining appenders still receive the event.",
                        appender.name(),
                        message
                    );
                }
            }
        }
    }

    /// Flush every attached appender. Best effort: one appender's failure
    /// does not prevent the others from flushing.
    pub fn flush(&self) {
        for appender in self.appenders() {
            if let Err(err) = appender.flush() {
                eprintln!(
                    "[LOGGER ERROR] Appender '{}' flush failed: {}",
                    appender.name(),
                    err
                );
            }
        }
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }
}
