//! Event formatters
//!
//! A formatter turns a [`LogEvent`](crate::core::event::LogEvent) into the
//! text a sink writes. Two implementations are provided:
//! - [`PatternFormatter`]: printf-style templates, compiled once
//! - [`JsonFormatter`]: one JSON object per event

mod json;
mod pattern;

pub use json::JsonFormatter;
pub use pattern::{PatternFormatter, DEFAULT_PATTERN};

use crate::core::event::LogEvent;
use std::sync::Arc;

/// Renders events to text.
///
/// Formatting is infallible: malformed template pieces degrade to literal
/// output at parse time instead of failing the logging call.
pub trait Formatter: Send + Sync {
    /// Render `event` as a string, including any trailing newline the
    /// format calls for.
    fn format(&self, event: &LogEvent) -> String;

    /// Deep copy with no shared state.
    fn clone_formatter(&self) -> Arc<dyn Formatter>;
}
