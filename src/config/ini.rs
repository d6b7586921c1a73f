//! INI-style configuration documents
//!
//! A forgiving line-oriented parser: `[section]` headers, `key = value`
//! pairs split at the first `=`, `#`/`;` comment lines, everything trimmed.
//! Malformed lines are skipped rather than rejected, so parsing itself
//! never fails; validation happens at the [`Config`](crate::config::Config)
//! layer. Keys seen before any section header land in the `global` section.
//!
//! Values are escaped on write and unescaped on read with the JSON-ish set
//! (`\n`, `\r`, `\t`, `\b`, `\f`, `\\`, `\"`), so multi-line pattern
//! strings survive a save/load round trip.

use crate::core::error::{LoggerError, Result};
use crate::core::level::LogLevel;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Section used for keys that appear before any `[section]` header.
pub const GLOBAL_SECTION: &str = "global";

/// An ordered section map parsed from (or serialized to) INI text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. Lines that are not a section header, a comment, or a
    /// `key = value` pair are ignored.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut document = Self::new();
        let mut current = GLOBAL_SECTION.to_owned();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                current = line[1..line.len() - 1].trim().to_owned();
                // A header alone is enough to make the section exist.
                document.sections.entry(current.clone()).or_default();
                continue;
            }
            let Some(equals) = line.find('=') else {
                continue;
            };
            let key = line[..equals].trim();
            if key.is_empty() {
                continue;
            }
            let value = unescape(line[equals + 1..].trim());
            document
                .sections
                .entry(current.clone())
                .or_default()
                .insert(key.to_owned(), value);
        }
        document
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation("config load", path.display().to_string(), e)
        })?;
        Ok(Self::parse(&content))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_string()).map_err(|e| {
            LoggerError::io_operation("config save", path.display().to_string(), e)
        })
    }

    /// Section names, sorted.
    #[must_use]
    pub fn sections(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Keys of one section, sorted. Empty for an unknown section.
    #[must_use]
    pub fn keys(&self, section: &str) -> Vec<&str> {
        self.sections
            .get(section)
            .map(|entries| entries.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_key(&self, section: &str, key: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|entries| entries.contains_key(key))
    }

    #[must_use]
    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Integer value of a key; `None` when absent or not a number.
    #[must_use]
    pub fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        self.get_str(section, key)?.parse().ok()
    }

    /// Boolean value of a key. Recognizes `true/1/yes/on` and
    /// `false/0/no/off`, case-insensitively; anything else is `None`.
    #[must_use]
    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        parse_bool(self.get_str(section, key)?)
    }

    #[must_use]
    pub fn get_level(&self, section: &str, key: &str) -> Option<LogLevel> {
        self.get_str(section, key)?.parse().ok()
    }

    /// Ensure a section exists, even with no keys.
    pub fn add_section(&mut self, section: &str) {
        self.sections.entry(section.trim().to_owned()).or_default();
    }

    pub fn set_str(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.trim().to_owned())
            .or_default()
            .insert(key.trim().to_owned(), value.into());
    }

    pub fn set_int(&mut self, section: &str, key: &str, value: i64) {
        self.set_str(section, key, value.to_string());
    }

    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) {
        self.set_str(section, key, if value { "true" } else { "false" });
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (section, entries) in &self.sections {
            writeln!(f, "[{section}]")?;
            for (key, value) in entries {
                writeln!(f, "{key} = {}", escape(value))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Shared truthy/falsy vocabulary for configuration values.
#[must_use]
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('"') => {
                out.push('"');
                chars.next();
            }
            Some('\\') => {
                out.push('\\');
                chars.next();
            }
            Some('b') => {
                out.push('\u{8}');
                chars.next();
            }
            Some('f') => {
                out.push('\u{c}');
                chars.next();
            }
            Some('n') => {
                out.push('\n');
                chars.next();
            }
            Some('r') => {
                out.push('\r');
                chars.next();
            }
            Some('t') => {
                out.push('\t');
                chars.next();
            }
            // Unknown escape: keep the backslash as-is.
            _ => out.push('\\'),
        }
    }
    out
}
