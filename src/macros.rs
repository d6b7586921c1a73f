//! Logging macros with call site capture
//!
//! The macros check the logger's threshold first and only then format the
//! message, so a disabled call never renders its arguments. File, module
//! path, and line of the call site ride along on the event.
//!
//! # Examples
//!
//! ```
//! use logchain::info;
//!
//! let logger = logchain::logger("server");
//!
//! info!(logger, "listening");
//!
//! let port = 8080;
//! info!(logger, "listening on port {}", port);
//! ```

/// Log at an explicit level, formatting lazily.
///
/// # Examples
///
/// ```
/// use logchain::{log, LogLevel};
/// # let logger = logchain::logger("doc.log_macro");
/// log!(logger, LogLevel::Info, "cache warmed");
/// log!(logger, LogLevel::Error, "status: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let level = $level;
        let logger = &$logger;
        if logger.is_enabled_for(level) {
            logger.log_at(
                level,
                format!($($arg)+),
                $crate::SourceLocation::new(file!(), module_path!(), line!()),
            );
        }
    }};
}

/// Log a trace-level message.
///
/// ```
/// # use logchain::{trace, LogLevel};
/// # let logger = logchain::logger("doc.trace");
/// # logger.set_level(LogLevel::Trace);
/// trace!(logger, "entering reconcile()");
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// ```
/// # use logchain::debug;
/// # let logger = logchain::logger("doc.debug");
/// debug!(logger, "retries left: {}", 2);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// ```
/// # use logchain::info;
/// # let logger = logchain::logger("doc.info");
/// info!(logger, "processed {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warn-level message.
///
/// ```
/// # use logchain::warn;
/// # let logger = logchain::logger("doc.warn");
/// warn!(logger, "retry {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// ```
/// # use logchain::error;
/// # let logger = logchain::logger("doc.error");
/// error!(logger, "connect failed: {}", "timeout");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
///
/// ```
/// # use logchain::fatal;
/// # let logger = logchain::logger("doc.fatal");
/// fatal!(logger, "unrecoverable: {}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
