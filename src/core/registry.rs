//! Logger registry
//!
//! Hands out `Arc<Logger>` instances by name, creating them on first
//! lookup. The root logger exists from construction, carries a console
//! appender so logging works before any configuration, and can never be
//! removed. A process-wide registry backs the free functions and the
//! logging macros.

use crate::appenders::ConsoleAppender;
use crate::core::level::LogLevel;
use crate::core::logger::Logger;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Name under which the root logger is registered.
pub const ROOT_LOGGER_NAME: &str = "root";

pub struct LoggerRegistry {
    root: Arc<Logger>,
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
}

impl LoggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        let root = Arc::new(Logger::new(ROOT_LOGGER_NAME));
        root.add_appender(Arc::new(ConsoleAppender::new()));

        let mut loggers = HashMap::new();
        loggers.insert(ROOT_LOGGER_NAME.to_owned(), Arc::clone(&root));
        Self {
            root,
            loggers: RwLock::new(loggers),
        }
    }

    #[must_use]
    pub fn root(&self) -> Arc<Logger> {
        Arc::clone(&self.root)
    }

    /// Get or create the logger registered under `name`. An empty name
    /// resolves to the root logger.
    ///
    /// A newly created logger copies its threshold from the longest
    /// registered dotted prefix of its name (`app.db.conn` looks at
    /// `app.db`, then `app`), falling back to the root's threshold. The
    /// copy happens once, at creation; later changes to a parent do not
    /// propagate.
    #[must_use]
    pub fn logger(&self, name: &str) -> Arc<Logger> {
        if name.is_empty() {
            return self.root();
        }
        if let Some(existing) = self.loggers.read().get(name) {
            return Arc::clone(existing);
        }

        let mut loggers = self.loggers.write();
        // Another thread may have created it between the two locks.
        if let Some(existing) = loggers.get(name) {
            return Arc::clone(existing);
        }

        let logger = Arc::new(Logger::new(name));
        logger.set_level(Self::inherited_level(&loggers, name, &self.root));
        loggers.insert(name.to_owned(), Arc::clone(&logger));
        logger
    }

    fn inherited_level(
        loggers: &HashMap<String, Arc<Logger>>,
        name: &str,
        root: &Arc<Logger>,
    ) -> LogLevel {
        let mut prefix = name;
        while let Some(pos) = prefix.rfind('.') {
            prefix = &prefix[..pos];
            if let Some(parent) = loggers.get(prefix) {
                return parent.level();
            }
        }
        root.level()
    }

    /// Remove a logger from the registry. The root logger is never
    /// removed. Existing `Arc` handles keep working; only the registration
    /// is dropped.
    pub fn remove(&self, name: &str) -> bool {
        if name == ROOT_LOGGER_NAME {
            return false;
        }
        self.loggers.write().remove(name).is_some()
    }

    /// Drop every registration except the root logger.
    pub fn clear(&self) {
        self.loggers
            .write()
            .retain(|name, _| name == ROOT_LOGGER_NAME);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.loggers.read().contains_key(name)
    }

    /// Registered logger names (including the root), sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry, created on first use.
pub fn registry() -> &'static LoggerRegistry {
    static REGISTRY: OnceLock<LoggerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(LoggerRegistry::new)
}

/// Get or create a logger in the process-wide registry.
#[must_use]
pub fn logger(name: &str) -> Arc<Logger> {
    registry().logger(name)
}

/// The process-wide root logger.
#[must_use]
pub fn root_logger() -> Arc<Logger> {
    registry().root()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_returns_same_instance() {
        let registry = LoggerRegistry::new();
        let first = registry.logger("app");
        let second = registry.logger("app");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_root_always_present() {
        let registry = LoggerRegistry::new();
        assert_eq!(registry.root().name(), ROOT_LOGGER_NAME);
        assert!(Arc::ptr_eq(&registry.logger("root"), &registry.root()));
        assert!(Arc::ptr_eq(&registry.logger(""), &registry.root()));
    }

    #[test]
    fn test_root_has_default_console_appender() {
        let registry = LoggerRegistry::new();
        assert_eq!(registry.root().appenders().len(), 1);
    }

    #[test]
    fn test_child_inherits_parent_level() {
        let registry = LoggerRegistry::new();
        registry.logger("app").set_level(LogLevel::Warn);

        let child = registry.logger("app.db");
        assert_eq!(child.level(), LogLevel::Warn);

        child.set_level(LogLevel::Trace);
        let grandchild = registry.logger("app.db.conn");
        assert_eq!(grandchild.level(), LogLevel::Trace);
    }

    #[test]
    fn test_inheritance_skips_unregistered_prefixes() {
        let registry = LoggerRegistry::new();
        registry.logger("app").set_level(LogLevel::Error);

        // "app.db" was never registered; the lookup walks up to "app".
        let logger = registry.logger("app.db.conn");
        assert_eq!(logger.level(), LogLevel::Error);
    }

    #[test]
    fn test_no_parent_inherits_root_level() {
        let registry = LoggerRegistry::new();
        registry.root().set_level(LogLevel::Debug);

        assert_eq!(registry.logger("standalone").level(), LogLevel::Debug);
        assert_eq!(registry.logger("new.tree").level(), LogLevel::Debug);
    }

    #[test]
    fn test_inheritance_is_snapshot_not_live() {
        let registry = LoggerRegistry::new();
        let parent = registry.logger("app");
        parent.set_level(LogLevel::Warn);

        let child = registry.logger("app.db");
        parent.set_level(LogLevel::Trace);
        assert_eq!(child.level(), LogLevel::Warn);
    }

    #[test]
    fn test_remove_logger() {
        let registry = LoggerRegistry::new();
        let original = registry.logger("app");

        assert!(registry.remove("app"));
        assert!(!registry.contains("app"));
        assert!(!registry.remove("app"));

        let recreated = registry.logger("app");
        assert!(!Arc::ptr_eq(&original, &recreated));
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let registry = LoggerRegistry::new();
        assert!(!registry.remove(ROOT_LOGGER_NAME));
        assert!(registry.contains(ROOT_LOGGER_NAME));
    }

    #[test]
    fn test_clear_keeps_root() {
        let registry = LoggerRegistry::new();
        let root_before = registry.root();
        registry.logger("a");
        registry.logger("b.c");

        registry.clear();
        assert_eq!(registry.names(), vec!["root"]);
        assert!(Arc::ptr_eq(&root_before, &registry.root()));
    }

    #[test]
    fn test_names_sorted() {
        let registry = LoggerRegistry::new();
        registry.logger("zebra");
        registry.logger("alpha");
        assert_eq!(registry.names(), vec!["alpha", "root", "zebra"]);
    }

    #[test]
    fn test_global_registry_free_functions() {
        let first = logger("registry.global.test");
        let second = logger("registry.global.test");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(root_logger().name(), ROOT_LOGGER_NAME);
    }
}
