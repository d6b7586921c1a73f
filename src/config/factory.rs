//! Construction of appenders, formatters, and filters from configuration
//!
//! A [`ComponentFactory`] turns a `(kind, params)` pair from a parsed
//! configuration into a live component. Nested components travel inside the
//! same flat map under a dotted prefix: an appender's formatter as
//! `formatter.type` / `formatter.pattern`, an async appender's backend as
//! `backend.type` / `backend.filename`, and so on. [`Config`] flattens
//! by-name references into this shape before calling the factory, so the
//! factory never consults the document itself.
//!
//! Construction is strict about values but lenient about vocabulary: a
//! present-but-unparseable parameter fails the component, while unknown
//! keys are ignored.
//!
//! [`Config`]: crate::config::Config

use crate::appenders::{AsyncAppender, ConsoleAppender, ConsoleTarget, FileAppender, RollPolicy};
use crate::core::appender::Appender;
use crate::core::level::LogLevel;
use crate::filters::{Filter, LevelRangeFilter};
use crate::formatters::{Formatter, JsonFormatter, PatternFormatter};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::ini::parse_bool;

/// Flat parameter map for one component, nested sub-components included
/// under dotted prefixes.
pub type ComponentParams = BTreeMap<String, String>;

/// File appenders configured without a `filename` write here.
pub const DEFAULT_FILE_NAME: &str = "default.log";

/// Builds components from configuration kinds and parameters.
///
/// Each method returns `None` when the kind is unknown or a parameter is
/// invalid; the caller reports the offending section.
pub trait ComponentFactory: Send + Sync {
    fn create_appender(&self, kind: &str, params: &ComponentParams) -> Option<Arc<dyn Appender>>;
    fn create_formatter(&self, kind: &str, params: &ComponentParams)
        -> Option<Arc<dyn Formatter>>;
    fn create_filter(&self, kind: &str, params: &ComponentParams) -> Option<Arc<dyn Filter>>;
}

/// Factory covering the built-in component vocabulary.
///
/// Appender kinds: `console`, `file`, `async`. Formatter kinds: `pattern`,
/// `json`. Filter kinds: `level`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComponentFactory;

impl DefaultComponentFactory {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn build_console(&self, params: &ComponentParams) -> Option<Arc<dyn Appender>> {
        let target = match params.get("target").map(|raw| raw.trim().to_lowercase()) {
            None => ConsoleTarget::Stdout,
            Some(raw) if raw == "stdout" => ConsoleTarget::Stdout,
            Some(raw) if raw == "stderr" => ConsoleTarget::Stderr,
            Some(_) => return None,
        };
        let color = bool_param(params, "color")?;

        let mut appender = ConsoleAppender::with_target(target);
        if let Some(color) = color {
            appender = appender.with_color(color);
        }
        if let Some(formatter) = self.nested_formatter(params)? {
            appender = appender.with_formatter(formatter);
        }
        Some(Arc::new(appender))
    }

    fn build_file(&self, params: &ComponentParams) -> Option<Arc<dyn Appender>> {
        let filename = params
            .get("filename")
            .map(String::as_str)
            .unwrap_or(DEFAULT_FILE_NAME);

        let max_bytes = u64_param(params, "max_size")?;
        if max_bytes == Some(0) {
            return None;
        }
        let policy = match params.get("roll") {
            // A bare max_size implies size-based rolling.
            None => match max_bytes {
                Some(max_bytes) => RollPolicy::Size { max_bytes },
                None => RollPolicy::Never,
            },
            Some(raw) => match (raw.parse::<RollPolicy>().ok()?, max_bytes) {
                (RollPolicy::Size { .. }, Some(max_bytes)) => RollPolicy::Size { max_bytes },
                (parsed, _) => parsed,
            },
        };

        let compress = bool_param(params, "compress")?.unwrap_or(false);
        #[cfg(not(feature = "file"))]
        if compress {
            return None;
        }

        let appender = FileAppender::with_policy(filename, policy).ok()?;
        #[cfg(feature = "file")]
        let appender = appender.with_compression(compress);
        let appender = match self.nested_formatter(params)? {
            Some(formatter) => appender.with_formatter(formatter),
            None => appender,
        };
        Some(Arc::new(appender))
    }

    fn build_async(&self, params: &ComponentParams) -> Option<Arc<dyn Appender>> {
        let backend_params = sub_params(params, "backend");
        let backend_kind = backend_params.get("type")?.clone();
        let backend = self.create_appender(&backend_kind, &backend_params)?;

        let mut appender = AsyncAppender::new(backend);
        if let Some(capacity) = usize_param(params, "capacity")? {
            appender = appender.with_queue_capacity(capacity);
        }
        if let Some(size) = usize_param(params, "batch_size")? {
            appender = appender.with_batch_size(size);
        }
        if let Some(millis) = u64_param(params, "flush_interval_ms")? {
            appender = appender.with_flush_interval(Duration::from_millis(millis));
        }
        if let Some(raw) = params.get("overflow") {
            appender = appender.with_overflow_policy(raw.parse().ok()?);
        }

        // The concrete type is erased at the return boundary, so the
        // pipeline has to be running before the handle leaves the factory.
        let workers = usize_param(params, "workers")?.unwrap_or(1);
        appender.start(workers).ok()?;
        Some(Arc::new(appender))
    }

    /// Formatter configured under the `formatter.` prefix, if any. Outer
    /// `None` means the sub-configuration is present but invalid.
    fn nested_formatter(&self, params: &ComponentParams) -> Option<Option<Arc<dyn Formatter>>> {
        let sub = sub_params(params, "formatter");
        if sub.is_empty() {
            return Some(None);
        }
        let kind = sub.get("type")?.clone();
        Some(Some(self.create_formatter(&kind, &sub)?))
    }
}

impl ComponentFactory for DefaultComponentFactory {
    fn create_appender(&self, kind: &str, params: &ComponentParams) -> Option<Arc<dyn Appender>> {
        match kind.trim().to_lowercase().as_str() {
            "console" => self.build_console(params),
            "file" => self.build_file(params),
            "async" => self.build_async(params),
            _ => None,
        }
    }

    fn create_formatter(
        &self,
        kind: &str,
        params: &ComponentParams,
    ) -> Option<Arc<dyn Formatter>> {
        match kind.trim().to_lowercase().as_str() {
            "pattern" => {
                let formatter = match params.get("pattern") {
                    Some(pattern) => PatternFormatter::new(pattern.clone()),
                    None => PatternFormatter::default(),
                };
                Some(Arc::new(formatter))
            }
            "json" => {
                let pretty = bool_param(params, "pretty")?.unwrap_or(false);
                let formatter = if pretty {
                    JsonFormatter::pretty()
                } else {
                    JsonFormatter::new()
                };
                Some(Arc::new(formatter))
            }
            _ => None,
        }
    }

    fn create_filter(&self, kind: &str, params: &ComponentParams) -> Option<Arc<dyn Filter>> {
        match kind.trim().to_lowercase().as_str() {
            "level" => {
                let min = level_param(params, "min")?.unwrap_or(LogLevel::Trace);
                let max = level_param(params, "max")?.unwrap_or(LogLevel::Fatal);
                let accept = bool_param(params, "accept_on_match")?.unwrap_or(true);
                Some(Arc::new(LevelRangeFilter::new(min, max, accept)))
            }
            _ => None,
        }
    }
}

/// Keys nested under `prefix.`, with the prefix stripped.
pub(crate) fn sub_params(params: &ComponentParams, prefix: &str) -> ComponentParams {
    let dotted = format!("{prefix}.");
    params
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(&dotted)
                .map(|rest| (rest.to_owned(), value.clone()))
        })
        .collect()
}

// The param helpers distinguish "absent" (inner None, caller defaults)
// from "present but unparseable" (outer None, component fails).

fn bool_param(params: &ComponentParams, key: &str) -> Option<Option<bool>> {
    match params.get(key) {
        None => Some(None),
        Some(raw) => parse_bool(raw).map(Some),
    }
}

fn usize_param(params: &ComponentParams, key: &str) -> Option<Option<usize>> {
    match params.get(key) {
        None => Some(None),
        Some(raw) => raw.trim().parse().ok().map(Some),
    }
}

fn u64_param(params: &ComponentParams, key: &str) -> Option<Option<u64>> {
    match params.get(key) {
        None => Some(None),
        Some(raw) => raw.trim().parse().ok().map(Some),
    }
}

fn level_param(params: &ComponentParams, key: &str) -> Option<Option<LogLevel>> {
    match params.get(key) {
        None => Some(None),
        Some(raw) => raw.parse().ok().map(Some),
    }
}
