//! Level-range filter

use crate::core::event::LogEvent;
use crate::core::level::LogLevel;
use crate::filters::{Filter, FilterDecision};
use std::sync::Arc;

/// Accepts (or denies, when inverted) events inside an inclusive level range.
///
/// With `accept_on_match` set, an event inside `[min, max]` is accepted and
/// one outside is denied; clearing the flag swaps both outcomes.
#[derive(Debug, Clone)]
pub struct LevelRangeFilter {
    min: LogLevel,
    max: LogLevel,
    accept_on_match: bool,
}

impl LevelRangeFilter {
    #[must_use]
    pub fn new(min: LogLevel, max: LogLevel, accept_on_match: bool) -> Self {
        Self {
            min,
            max,
            accept_on_match,
        }
    }

    /// Accept everything at `min` or above.
    #[must_use]
    pub fn at_least(min: LogLevel) -> Self {
        Self::new(min, LogLevel::Fatal, true)
    }

    #[must_use]
    pub fn min(&self) -> LogLevel {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> LogLevel {
        self.max
    }

    #[must_use]
    pub fn accept_on_match(&self) -> bool {
        self.accept_on_match
    }
}

impl Filter for LevelRangeFilter {
    fn decide(&self, event: &LogEvent) -> FilterDecision {
        let matched = event.level >= self.min && event.level <= self.max;
        if matched == self.accept_on_match {
            FilterDecision::Accept
        } else {
            FilterDecision::Deny
        }
    }

    fn clone_filter(&self) -> Arc<dyn Filter> {
        Arc::new(self.clone())
    }
}
