//! Tri-state event filters
//!
//! Filters vote `Accept`, `Deny`, or `Neutral` on each event. A logger's
//! chain is evaluated in registration order and the first non-neutral vote
//! wins; an empty chain accepts everything. Composite filters build boolean
//! trees out of the same protocol.

mod composite;
mod level;

pub use composite::{AndFilter, NotFilter, OrFilter};
pub use level::LevelRangeFilter;

use crate::core::event::LogEvent;
use std::sync::Arc;

/// Outcome of a single filter consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Deny,
    Neutral,
}

/// A tri-state predicate over log events.
pub trait Filter: Send + Sync {
    fn decide(&self, event: &LogEvent) -> FilterDecision;

    /// Deep copy, independent of the original. Used when a chain is shared
    /// across configuration reapplications.
    fn clone_filter(&self) -> Arc<dyn Filter>;
}

/// Evaluate a chain: empty accepts, otherwise the first non-neutral vote
/// short-circuits. Returns `Neutral` when every filter abstained; callers
/// treat anything but `Deny` as deliverable.
pub fn evaluate_chain(filters: &[Arc<dyn Filter>], event: &LogEvent) -> FilterDecision {
    if filters.is_empty() {
        return FilterDecision::Accept;
    }
    for filter in filters {
        let decision = filter.decide(event);
        if decision != FilterDecision::Neutral {
            return decision;
        }
    }
    FilterDecision::Neutral
}
