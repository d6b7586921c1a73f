//! # logchain
//!
//! A hierarchical logging library: named loggers dispatch events through
//! tri-state filter chains to appenders, with pattern and JSON formatting,
//! rolling log files, and a bounded asynchronous pipeline in front of slow
//! targets.
//!
//! ## Features
//!
//! - **Named logger tree**: dot-separated names with level inheritance and
//!   a process-wide registry
//! - **Cheap disabled calls**: the logging macros gate before formatting
//! - **Appenders**: console, rolling file, and an async wrapper with a
//!   bounded queue and selectable overflow policy
//! - **Declarative setup**: INI configuration applied in one step, with
//!   validation and rollback
//!
//! ## Quick start
//!
//! ```
//! use logchain::prelude::*;
//! use logchain::info;
//!
//! let logger = logchain::logger("app.server");
//! logger.set_level(LogLevel::Debug);
//! info!(logger, "listening on {}", 8080);
//! ```
//!
//! Or configure the whole tree from text:
//!
//! ```
//! logchain::configure_from_str(
//!     "[logger.app]\n\
//!      level = debug\n\
//!      appenders = console\n\
//!      \n\
//!      [appender.console]\n\
//!      type = console\n\
//!      target = stderr\n",
//! )?;
//! # Ok::<(), logchain::LoggerError>(())
//! ```

pub mod appenders;
pub mod config;
pub mod core;
pub mod filters;
pub mod formatters;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{AsyncAppender, ConsoleAppender, ConsoleTarget, FileAppender, RollPolicy};
    pub use crate::config::{
        configure_from_file, configure_from_str, ComponentFactory, Config,
        DefaultComponentFactory,
    };
    pub use crate::core::{
        logger, root_logger, stats, Appender, LogEvent, LogLevel, Logger, LoggerError,
        LoggerRegistry, OverflowPolicy, Result, SourceLocation, StatsSnapshot,
    };
    pub use crate::filters::{Filter, FilterDecision, LevelRangeFilter};
    pub use crate::formatters::{Formatter, JsonFormatter, PatternFormatter};
}

pub use crate::appenders::{AsyncAppender, ConsoleAppender, FileAppender};
pub use crate::config::{
    configure_from_file, configure_from_str, ComponentFactory, Config, DefaultComponentFactory,
};
pub use crate::core::{
    logger, registry, root_logger, stats, Appender, LogEvent, LogLevel, Logger, LoggerError,
    LoggerRegistry, OverflowPolicy, Result, SourceLocation, StatsRegistry, StatsSnapshot,
    ROOT_LOGGER_NAME,
};
pub use crate::filters::{Filter, FilterDecision};
pub use crate::formatters::Formatter;
