//! Delivery statistics
//!
//! Lock-free counters the dispatch path and the async pipeline report into.
//! Recording is fire-and-forget: it never fails, never blocks beyond the
//! atomics, and is a no-op while collection is disabled.

use crate::core::level::LogLevel;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Number of event levels tracked (`Trace` through `Fatal`).
const LEVEL_COUNT: usize = 6;

/// Counters for one logger (or for the whole process).
#[derive(Debug)]
pub struct LoggerStats {
    counts: [AtomicU64; LEVEL_COUNT],
    bytes: AtomicU64,
    dropped: AtomicU64,
    dropped_bytes: AtomicU64,
}

impl LoggerStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
            bytes: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            dropped_bytes: AtomicU64::new(0),
        }
    }

    pub fn record_event(&self, level: LogLevel, message_bytes: usize) {
        let index = level as usize;
        if index >= LEVEL_COUNT {
            return;
        }
        self.counts[index].fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(message_bytes as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, message_bytes: usize) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        self.dropped_bytes
            .fetch_add(message_bytes as u64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let counts = std::array::from_fn(|i| self.counts[i].load(Ordering::Relaxed));
        StatsSnapshot {
            total: counts.iter().sum(),
            counts,
            bytes: self.bytes.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dropped_bytes: self.dropped_bytes.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
        self.bytes.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.dropped_bytes.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of one `LoggerStats`, indexable by `LogLevel`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    pub counts: [u64; LEVEL_COUNT],
    pub total: u64,
    pub bytes: u64,
    pub dropped: u64,
    pub dropped_bytes: u64,
}

impl StatsSnapshot {
    #[must_use]
    pub fn count_at(&self, level: LogLevel) -> u64 {
        self.counts.get(level as usize).copied().unwrap_or(0)
    }
}

/// Process-wide statistics, keyed by logger name plus a global aggregate.
pub struct StatsRegistry {
    enabled: AtomicBool,
    global: LoggerStats,
    per_logger: RwLock<HashMap<String, Arc<LoggerStats>>>,
}

impl StatsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            global: LoggerStats::new(),
            per_logger: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn record_event(&self, logger_name: &str, level: LogLevel, message_bytes: usize) {
        if !self.is_enabled() {
            return;
        }
        self.global.record_event(level, message_bytes);
        self.stats_for(logger_name).record_event(level, message_bytes);
    }

    pub fn record_dropped(&self, logger_name: &str, message_bytes: usize) {
        if !self.is_enabled() {
            return;
        }
        self.global.record_dropped(message_bytes);
        self.stats_for(logger_name).record_dropped(message_bytes);
    }

    #[must_use]
    pub fn global_snapshot(&self) -> StatsSnapshot {
        self.global.snapshot()
    }

    #[must_use]
    pub fn logger_snapshot(&self, logger_name: &str) -> Option<StatsSnapshot> {
        self.per_logger
            .read()
            .get(logger_name)
            .map(|stats| stats.snapshot())
    }

    pub fn reset(&self) {
        self.global.reset();
        self.per_logger.write().clear();
    }

    fn stats_for(&self, logger_name: &str) -> Arc<LoggerStats> {
        if let Some(stats) = self.per_logger.read().get(logger_name) {
            return Arc::clone(stats);
        }
        let mut map = self.per_logger.write();
        Arc::clone(
            map.entry(logger_name.to_owned())
                .or_insert_with(|| Arc::new(LoggerStats::new())),
        )
    }
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide collector used by loggers and async appenders.
pub fn stats() -> &'static StatsRegistry {
    static STATS: OnceLock<StatsRegistry> = OnceLock::new();
    STATS.get_or_init(StatsRegistry::new)
}
