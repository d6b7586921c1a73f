//! Overflow policies for the async delivery queue
//!
//! When the bounded queue cannot immediately accept a new event, the
//! configured policy decides whether the producer waits or which side of
//! the queue loses an event.

use std::fmt;
use std::str::FromStr;

/// Behavior when the async queue is full.
///
/// # Example
///
/// ```
/// use logchain::OverflowPolicy;
///
/// // Default: producers wait for space.
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::Block);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Block the producer until space frees.
    ///
    /// This is deliberate backpressure: no event is lost, but a slow
    /// backend stalls callers.
    Block,

    /// Evict the oldest queued event, then retry the push once.
    ///
    /// Keeps the newest events at the cost of the oldest. Evicted events
    /// count as dropped.
    DropOldest,

    /// Reject the incoming event and leave the queue untouched.
    ///
    /// Keeps the oldest events; the newest is counted as dropped.
    DropNewest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::Block
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "block" => Ok(OverflowPolicy::Block),
            "drop_oldest" | "dropoldest" => Ok(OverflowPolicy::DropOldest),
            "drop_newest" | "dropnewest" => Ok(OverflowPolicy::DropNewest),
            _ => Err(format!("Unknown overflow policy: {}", s)),
        }
    }
}
