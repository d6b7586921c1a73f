//! Appender implementations

pub mod async_appender;
pub mod console;
pub mod file;

pub use async_appender::{AsyncAppender, DEFAULT_FLUSH_INTERVAL, DEFAULT_QUEUE_CAPACITY};
pub use console::{ConsoleAppender, ConsoleTarget};
pub use file::{FileAppender, RollPolicy, DEFAULT_MAX_BYTES};

pub use crate::core::Appender;
