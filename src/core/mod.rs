//! Core logger types and traits

pub mod appender;
pub mod error;
pub mod event;
pub mod level;
pub mod logger;
pub mod overflow_policy;
pub mod queue;
pub mod registry;
pub mod stats;

pub use appender::Appender;
pub use error::{LoggerError, Result};
pub use event::{thread_identity, LogEvent, SourceLocation, ThreadIdentity};
pub use level::LogLevel;
pub use logger::Logger;
pub use overflow_policy::OverflowPolicy;
pub use queue::BoundedQueue;
pub use registry::{
    logger, registry, root_logger, LoggerRegistry, ROOT_LOGGER_NAME,
};
pub use stats::{stats, LoggerStats, StatsRegistry, StatsSnapshot};
