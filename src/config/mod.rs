//! Declarative configuration of the logger tree
//!
//! A [`Config`] is parsed from an INI document and applied to a
//! [`LoggerRegistry`] in one step. Sections describe the tree by name:
//!
//! ```text
//! [global]
//! root_level = info
//! enable_statistics = true
//!
//! [logger.app.db]
//! level = debug
//! appenders = main
//! filters = warnings_only
//!
//! [appender.main]
//! type = async
//! capacity = 8192
//! backend = disk
//!
//! [appender.disk]
//! type = file
//! filename = logs/app.log
//! roll = daily
//! formatter = compact
//!
//! [formatter.compact]
//! type = pattern
//! pattern = %d [%p] %m%n
//!
//! [filter.warnings_only]
//! type = level
//! min = warn
//! ```
//!
//! `formatter = NAME` and `backend = NAME` are by-name references to other
//! sections. Before construction they are flattened into the dotted
//! parameter form ([`ComponentParams`]) the factory consumes, so a custom
//! [`ComponentFactory`] never sees the document. A reference wins over
//! inline dotted keys for the same sub-component.
//!
//! [`Config::validate`] checks the document shape: referenced names exist,
//! levels parse, backend chains do not cycle. It cannot know a factory's
//! vocabulary, so unknown kinds surface later, as apply-time errors naming
//! the offending section.

pub mod factory;
pub mod ini;

pub use factory::{ComponentFactory, ComponentParams, DefaultComponentFactory, DEFAULT_FILE_NAME};
pub use ini::{ConfigDocument, GLOBAL_SECTION};

use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use crate::core::level::LogLevel;
use crate::core::registry::{registry, LoggerRegistry};
use crate::core::stats::stats;
use crate::filters::Filter;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const LOGGER_PREFIX: &str = "logger.";
const APPENDER_PREFIX: &str = "appender.";
const FORMATTER_PREFIX: &str = "formatter.";
const FILTER_PREFIX: &str = "filter.";

/// Settings from the `[global]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Level for the root logger. Kept as written; parsed by `validate`.
    pub root_level: Option<String>,
    pub enable_statistics: Option<bool>,
}

/// One `[logger.NAME]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerOptions {
    /// Level as written; parsed by `validate`.
    pub level: Option<String>,
    /// Names of `[appender.*]` sections, in attachment order.
    pub appenders: Vec<String>,
    /// Names of `[filter.*]` sections, in chain order.
    pub filters: Vec<String>,
}

/// One `[appender.NAME]`, `[formatter.NAME]`, or `[filter.NAME]` section:
/// the `type` key plus everything else as parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentOptions {
    pub kind: String,
    pub params: ComponentParams,
}

impl ComponentOptions {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: ComponentParams::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A complete configuration document, decoupled from any registry until
/// [`apply`](Config::apply).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub global: GlobalOptions,
    pub loggers: BTreeMap<String, LoggerOptions>,
    pub appenders: BTreeMap<String, ComponentOptions>,
    pub formatters: BTreeMap<String, ComponentOptions>,
    pub filters: BTreeMap<String, ComponentOptions>,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. Unknown sections and keys are ignored; use
    /// [`validate`](Config::validate) to vet the result.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        Self::from_document(&ConfigDocument::parse(content))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_document(&ConfigDocument::load(path)?))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_document().save(path)
    }

    #[must_use]
    pub fn from_document(doc: &ConfigDocument) -> Self {
        let mut config = Self::new();
        config.global.root_level = doc
            .get_str(GLOBAL_SECTION, "root_level")
            .map(ToOwned::to_owned);
        config.global.enable_statistics = doc.get_bool(GLOBAL_SECTION, "enable_statistics");

        for section in doc.sections() {
            if let Some(name) = section.strip_prefix(LOGGER_PREFIX) {
                if name.is_empty() {
                    continue;
                }
                let options = LoggerOptions {
                    level: doc.get_str(section, "level").map(ToOwned::to_owned),
                    appenders: doc
                        .get_str(section, "appenders")
                        .map(split_list)
                        .unwrap_or_default(),
                    filters: doc
                        .get_str(section, "filters")
                        .map(split_list)
                        .unwrap_or_default(),
                };
                config.loggers.insert(name.to_owned(), options);
            } else if let Some(name) = section.strip_prefix(APPENDER_PREFIX) {
                if !name.is_empty() {
                    config
                        .appenders
                        .insert(name.to_owned(), component_options(doc, section));
                }
            } else if let Some(name) = section.strip_prefix(FORMATTER_PREFIX) {
                if !name.is_empty() {
                    config
                        .formatters
                        .insert(name.to_owned(), component_options(doc, section));
                }
            } else if let Some(name) = section.strip_prefix(FILTER_PREFIX) {
                if !name.is_empty() {
                    config
                        .filters
                        .insert(name.to_owned(), component_options(doc, section));
                }
            }
        }
        config
    }

    #[must_use]
    pub fn to_document(&self) -> ConfigDocument {
        let mut doc = ConfigDocument::new();
        if let Some(level) = &self.global.root_level {
            doc.set_str(GLOBAL_SECTION, "root_level", level.clone());
        }
        if let Some(enabled) = self.global.enable_statistics {
            doc.set_bool(GLOBAL_SECTION, "enable_statistics", enabled);
        }

        for (name, options) in &self.loggers {
            let section = format!("{LOGGER_PREFIX}{name}");
            doc.add_section(&section);
            if let Some(level) = &options.level {
                doc.set_str(&section, "level", level.clone());
            }
            if !options.appenders.is_empty() {
                doc.set_str(&section, "appenders", options.appenders.join(", "));
            }
            if !options.filters.is_empty() {
                doc.set_str(&section, "filters", options.filters.join(", "));
            }
        }
        for (name, options) in &self.appenders {
            write_component(&mut doc, &format!("{APPENDER_PREFIX}{name}"), options);
        }
        for (name, options) in &self.formatters {
            write_component(&mut doc, &format!("{FORMATTER_PREFIX}{name}"), options);
        }
        for (name, options) in &self.filters {
            write_component(&mut doc, &format!("{FILTER_PREFIX}{name}"), options);
        }
        doc
    }

    /// Check document shape without constructing anything.
    pub fn validate(&self) -> Result<()> {
        if let Some(raw) = &self.global.root_level {
            parse_level(GLOBAL_SECTION, raw)?;
        }

        for (name, options) in &self.loggers {
            let section = format!("{LOGGER_PREFIX}{name}");
            if let Some(raw) = &options.level {
                parse_level(&section, raw)?;
            }
            for appender in &options.appenders {
                if !self.appenders.contains_key(appender) {
                    return Err(LoggerError::config(
                        section,
                        format!("unknown appender '{appender}'"),
                    ));
                }
            }
            for filter in &options.filters {
                if !self.filters.contains_key(filter) {
                    return Err(LoggerError::config(
                        section,
                        format!("unknown filter '{filter}'"),
                    ));
                }
            }
        }

        for (name, options) in &self.appenders {
            let section = format!("{APPENDER_PREFIX}{name}");
            if options.kind.trim().is_empty() {
                return Err(LoggerError::config(section, "missing type"));
            }
            if let Some(formatter) = options.params.get("formatter") {
                if !self.formatters.contains_key(formatter) {
                    return Err(LoggerError::config(
                        section,
                        format!("unknown formatter '{formatter}'"),
                    ));
                }
            }
            for key in ["capacity", "batch_size", "flush_interval_ms", "max_size", "workers"] {
                if let Some(raw) = options.params.get(key) {
                    let value: u64 = raw.trim().parse().map_err(|_| {
                        LoggerError::config(
                            section.clone(),
                            format!("'{key}' is not a number: '{raw}'"),
                        )
                    })?;
                    if value == 0 && matches!(key, "capacity" | "batch_size" | "max_size") {
                        return Err(LoggerError::config(
                            section,
                            format!("'{key}' must be positive"),
                        ));
                    }
                }
            }
            self.check_backend_chain(name)?;
        }

        for (name, options) in &self.formatters {
            if options.kind.trim().is_empty() {
                return Err(LoggerError::config(
                    format!("{FORMATTER_PREFIX}{name}"),
                    "missing type",
                ));
            }
        }
        for (name, options) in &self.filters {
            let section = format!("{FILTER_PREFIX}{name}");
            if options.kind.trim().is_empty() {
                return Err(LoggerError::config(section, "missing type"));
            }
            for key in ["min", "max"] {
                if let Some(raw) = options.params.get(key) {
                    parse_level(&section, raw)?;
                }
            }
        }
        Ok(())
    }

    /// Validate, then configure `registry` through `factory`.
    ///
    /// Loggers are processed in name order; each one's components are built
    /// before it is touched, and appender instances are shared across the
    /// loggers that name them. On failure, loggers this call created are
    /// removed again. Pre-existing loggers keep any reconfiguration applied
    /// before the failure; the error names the section that caused it.
    pub fn apply(&self, registry: &LoggerRegistry, factory: &dyn ComponentFactory) -> Result<()> {
        self.validate()?;

        if let Some(raw) = &self.global.root_level {
            registry.root().set_level(parse_level(GLOBAL_SECTION, raw)?);
        }
        if let Some(enabled) = self.global.enable_statistics {
            stats().set_enabled(enabled);
        }

        let mut cache: BTreeMap<String, Arc<dyn Appender>> = BTreeMap::new();
        let mut created: Vec<String> = Vec::new();
        let outcome = self.apply_loggers(registry, factory, &mut cache, &mut created);
        if outcome.is_err() {
            for name in &created {
                registry.remove(name);
            }
        }
        outcome
    }

    fn apply_loggers(
        &self,
        registry: &LoggerRegistry,
        factory: &dyn ComponentFactory,
        cache: &mut BTreeMap<String, Arc<dyn Appender>>,
        created: &mut Vec<String>,
    ) -> Result<()> {
        for (name, options) in &self.loggers {
            let section = format!("{LOGGER_PREFIX}{name}");

            let mut appenders = Vec::with_capacity(options.appenders.len());
            for appender_name in &options.appenders {
                appenders.push(self.build_appender(appender_name, factory, cache)?);
            }
            let mut filters = Vec::with_capacity(options.filters.len());
            for filter_name in &options.filters {
                filters.push(self.build_filter(filter_name, factory)?);
            }

            if !registry.contains(name) {
                created.push(name.clone());
            }
            let logger = registry.logger(name);
            if let Some(raw) = &options.level {
                logger.set_level(parse_level(&section, raw)?);
            }
            logger.clear_appenders();
            for appender in appenders {
                logger.add_appender(appender);
            }
            logger.clear_filters();
            for filter in filters {
                logger.add_filter(filter);
            }
        }
        Ok(())
    }

    fn build_appender(
        &self,
        name: &str,
        factory: &dyn ComponentFactory,
        cache: &mut BTreeMap<String, Arc<dyn Appender>>,
    ) -> Result<Arc<dyn Appender>> {
        if let Some(existing) = cache.get(name) {
            return Ok(Arc::clone(existing));
        }
        let options = self.appenders.get(name).ok_or_else(|| {
            LoggerError::config(format!("{APPENDER_PREFIX}{name}"), "unknown appender")
        })?;
        let params = self.appender_params(name, &mut Vec::new())?;
        let appender = factory.create_appender(&options.kind, &params).ok_or_else(|| {
            LoggerError::config(
                format!("{APPENDER_PREFIX}{name}"),
                format!("factory rejected appender kind '{}'", options.kind),
            )
        })?;
        cache.insert(name.to_owned(), Arc::clone(&appender));
        Ok(appender)
    }

    fn build_filter(&self, name: &str, factory: &dyn ComponentFactory) -> Result<Arc<dyn Filter>> {
        let options = self.filters.get(name).ok_or_else(|| {
            LoggerError::config(format!("{FILTER_PREFIX}{name}"), "unknown filter")
        })?;
        factory.create_filter(&options.kind, &options.params).ok_or_else(|| {
            LoggerError::config(
                format!("{FILTER_PREFIX}{name}"),
                format!("factory rejected filter kind '{}'", options.kind),
            )
        })
    }

    /// Parameters for one appender with `formatter` and `backend` name
    /// references flattened into dotted keys. `seen` carries the names
    /// already on the backend chain.
    fn appender_params(&self, name: &str, seen: &mut Vec<String>) -> Result<ComponentParams> {
        let options = self.appenders.get(name).ok_or_else(|| {
            LoggerError::config(format!("{APPENDER_PREFIX}{name}"), "unknown appender")
        })?;
        if seen.iter().any(|on_chain| on_chain == name) {
            return Err(LoggerError::config(
                format!("{APPENDER_PREFIX}{name}"),
                "backend reference cycle",
            ));
        }
        seen.push(name.to_owned());

        let mut params = options.params.clone();

        if let Some(formatter_name) = params.remove("formatter") {
            let formatter = self.formatters.get(&formatter_name).ok_or_else(|| {
                LoggerError::config(
                    format!("{APPENDER_PREFIX}{name}"),
                    format!("unknown formatter '{formatter_name}'"),
                )
            })?;
            params.insert("formatter.type".to_owned(), formatter.kind.clone());
            for (key, value) in &formatter.params {
                params.insert(format!("formatter.{key}"), value.clone());
            }
        }

        if let Some(backend_name) = params.remove("backend") {
            let backend = self.appenders.get(&backend_name).ok_or_else(|| {
                LoggerError::config(
                    format!("{APPENDER_PREFIX}{name}"),
                    format!("unknown backend appender '{backend_name}'"),
                )
            })?;
            let backend_params = self.appender_params(&backend_name, seen)?;
            params.insert("backend.type".to_owned(), backend.kind.clone());
            for (key, value) in backend_params {
                params.insert(format!("backend.{key}"), value);
            }
        }
        Ok(params)
    }

    fn check_backend_chain(&self, root: &str) -> Result<()> {
        let mut seen = vec![root.to_owned()];
        let mut holder = root.to_owned();
        while let Some(backend) = self
            .appenders
            .get(&holder)
            .and_then(|options| options.params.get("backend"))
            .cloned()
        {
            let section = format!("{APPENDER_PREFIX}{holder}");
            if !self.appenders.contains_key(&backend) {
                return Err(LoggerError::config(
                    section,
                    format!("unknown backend appender '{backend}'"),
                ));
            }
            if seen.contains(&backend) {
                return Err(LoggerError::config(
                    section,
                    format!("backend reference cycle through '{backend}'"),
                ));
            }
            seen.push(backend.clone());
            holder = backend;
        }
        Ok(())
    }
}

/// Load a configuration file and apply it to the global registry with the
/// built-in factory.
pub fn configure_from_file(path: impl AsRef<Path>) -> Result<()> {
    Config::load(path)?.apply(registry(), &DefaultComponentFactory::new())
}

/// Parse configuration text and apply it to the global registry with the
/// built-in factory.
pub fn configure_from_str(content: &str) -> Result<()> {
    Config::parse(content).apply(registry(), &DefaultComponentFactory::new())
}

fn component_options(doc: &ConfigDocument, section: &str) -> ComponentOptions {
    let mut options = ComponentOptions::default();
    for key in doc.keys(section) {
        let value = doc.get_str(section, key).unwrap_or_default().to_owned();
        if key == "type" {
            options.kind = value;
        } else {
            options.params.insert(key.to_owned(), value);
        }
    }
    options
}

fn write_component(doc: &mut ConfigDocument, section: &str, options: &ComponentOptions) {
    doc.set_str(section, "type", options.kind.clone());
    for (key, value) in &options.params {
        doc.set_str(section, key, value.clone());
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_level(section: &str, raw: &str) -> Result<LogLevel> {
    raw.parse()
        .map_err(|_| LoggerError::config(section, format!("invalid level '{raw}'")))
}
