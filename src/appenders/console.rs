//! Console appender

use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use crate::core::event::LogEvent;
use crate::formatters::{Formatter, PatternFormatter};
use parking_lot::RwLock;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "console")]
use colored::Colorize;

/// Which standard stream the appender writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

/// Appender writing formatted events to stdout or stderr.
///
/// Each write locks the stream handle so lines from concurrent loggers do
/// not interleave mid-line, and flushes immediately: console output is for
/// watching live. With the `console` feature the whole line is colored by
/// level.
pub struct ConsoleAppender {
    name: String,
    target: ConsoleTarget,
    use_color: AtomicBool,
    formatter: RwLock<Arc<dyn Formatter>>,
}

impl ConsoleAppender {
    #[must_use]
    pub fn new() -> Self {
        Self::with_target(ConsoleTarget::Stdout)
    }

    #[must_use]
    pub fn with_target(target: ConsoleTarget) -> Self {
        let name = match target {
            ConsoleTarget::Stdout => "console(stdout)",
            ConsoleTarget::Stderr => "console(stderr)",
        };
        Self {
            name: name.to_string(),
            target,
            use_color: AtomicBool::new(true),
            formatter: RwLock::new(Arc::new(PatternFormatter::default()) as Arc<dyn Formatter>),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_formatter(self, formatter: Arc<dyn Formatter>) -> Self {
        *self.formatter.write() = formatter;
        self
    }

    #[must_use]
    pub fn with_color(self, enabled: bool) -> Self {
        self.use_color.store(enabled, Ordering::Relaxed);
        self
    }

    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        *self.formatter.write() = formatter;
    }

    pub fn set_color(&self, enabled: bool) {
        self.use_color.store(enabled, Ordering::Relaxed);
    }

    #[must_use]
    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    #[must_use]
    pub fn color_enabled(&self) -> bool {
        self.use_color.load(Ordering::Relaxed)
    }

    fn colorize(&self, line: String, event: &LogEvent) -> String {
        #[cfg(feature = "console")]
        if self.color_enabled() {
            return line.color(event.level.color()).to_string();
        }
        #[cfg(not(feature = "console"))]
        let _ = event;
        line
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&self, event: &Arc<LogEvent>) -> Result<()> {
        let line = self.formatter.read().format(event);
        let line = self.colorize(line, event);

        let write = |handle: &mut dyn Write| -> std::io::Result<()> {
            handle.write_all(line.as_bytes())?;
            handle.flush()
        };

        let outcome = match self.target {
            ConsoleTarget::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                write(&mut handle)
            }
            ConsoleTarget::Stderr => {
                let stderr = std::io::stderr();
                let mut handle = stderr.lock();
                write(&mut handle)
            }
        };
        outcome.map_err(|e| LoggerError::io_operation("console write", self.name.clone(), e))
    }

    fn flush(&self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().flush()?,
            ConsoleTarget::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
