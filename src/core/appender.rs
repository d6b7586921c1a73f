//! Appender trait for log output destinations

use crate::core::error::Result;
use crate::core::event::LogEvent;
use std::sync::Arc;

/// A delivery target for log events.
///
/// Implementations take `&self` and use interior mutability so one instance
/// can be attached to several loggers at once (`Arc<dyn Appender>`). Errors
/// from `append`/`flush` are swallowed at the dispatch boundary; they never
/// reach the logging caller.
pub trait Appender: Send + Sync {
    /// Deliver one event. The event is shared; implementations that need to
    /// keep it past the call (the async pipeline) clone the `Arc`.
    fn append(&self, event: &Arc<LogEvent>) -> Result<()>;

    /// Push any buffered output to the underlying target.
    fn flush(&self) -> Result<()>;

    /// Diagnostic name, unique per configured instance.
    fn name(&self) -> &str;
}
