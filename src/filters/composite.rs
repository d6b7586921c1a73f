//! Composite filters: boolean combinators over child filters

use crate::core::event::LogEvent;
use crate::filters::{Filter, FilterDecision};
use std::sync::Arc;

/// All children must accept.
///
/// Empty is `Neutral`. Any `Deny` short-circuits to `Deny`; otherwise a
/// single neutral child downgrades the result to `Neutral`.
#[derive(Default)]
pub struct AndFilter {
    filters: Vec<Arc<dyn Filter>>,
}

impl AndFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }
}

impl Filter for AndFilter {
    fn decide(&self, event: &LogEvent) -> FilterDecision {
        if self.filters.is_empty() {
            return FilterDecision::Neutral;
        }
        let mut saw_neutral = false;
        for filter in &self.filters {
            match filter.decide(event) {
                FilterDecision::Deny => return FilterDecision::Deny,
                FilterDecision::Neutral => saw_neutral = true,
                FilterDecision::Accept => {}
            }
        }
        if saw_neutral {
            FilterDecision::Neutral
        } else {
            FilterDecision::Accept
        }
    }

    fn clone_filter(&self) -> Arc<dyn Filter> {
        Arc::new(Self {
            filters: self.filters.iter().map(|f| f.clone_filter()).collect(),
        })
    }
}

/// Any child may accept.
///
/// Empty is `Neutral`. Any `Accept` short-circuits to `Accept`; otherwise a
/// single neutral child downgrades the result to `Neutral`, and all-deny is
/// `Deny`.
#[derive(Default)]
pub struct OrFilter {
    filters: Vec<Arc<dyn Filter>>,
}

impl OrFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }
}

impl Filter for OrFilter {
    fn decide(&self, event: &LogEvent) -> FilterDecision {
        if self.filters.is_empty() {
            return FilterDecision::Neutral;
        }
        let mut saw_neutral = false;
        for filter in &self.filters {
            match filter.decide(event) {
                FilterDecision::Accept => return FilterDecision::Accept,
                FilterDecision::Neutral => saw_neutral = true,
                FilterDecision::Deny => {}
            }
        }
        if saw_neutral {
            FilterDecision::Neutral
        } else {
            FilterDecision::Deny
        }
    }

    fn clone_filter(&self) -> Arc<dyn Filter> {
        Arc::new(Self {
            filters: self.filters.iter().map(|f| f.clone_filter()).collect(),
        })
    }
}

/// Inverts its inner filter: accept and deny swap, neutral passes through.
pub struct NotFilter {
    inner: Arc<dyn Filter>,
}

impl NotFilter {
    #[must_use]
    pub fn new(inner: Arc<dyn Filter>) -> Self {
        Self { inner }
    }
}

impl Filter for NotFilter {
    fn decide(&self, event: &LogEvent) -> FilterDecision {
        match self.inner.decide(event) {
            FilterDecision::Accept => FilterDecision::Deny,
            FilterDecision::Deny => FilterDecision::Accept,
            FilterDecision::Neutral => FilterDecision::Neutral,
        }
    }

    fn clone_filter(&self) -> Arc<dyn Filter> {
        Arc::new(Self {
            inner: self.inner.clone_filter(),
        })
    }
}
