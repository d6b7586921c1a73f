//! JSON formatter

use crate::core::event::LogEvent;
use crate::formatters::Formatter;
use chrono::SecondsFormat;
use std::sync::Arc;

/// Renders each event as one JSON object terminated by a newline.
///
/// Fields: `timestamp` (RFC 3339, millisecond precision), `level`, `logger`,
/// `thread_id`, `message`, plus `thread_name` and the call-site fields when
/// present.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Multi-line indented objects, for humans reading raw output.
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, event: &LogEvent) -> String {
        let mut fields = serde_json::Map::new();

        fields.insert(
            "timestamp".to_string(),
            serde_json::Value::String(
                event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        );
        fields.insert(
            "level".to_string(),
            serde_json::Value::String(event.level.as_str().to_string()),
        );
        fields.insert(
            "logger".to_string(),
            serde_json::Value::String(event.logger_name.clone()),
        );
        fields.insert(
            "thread_id".to_string(),
            serde_json::Value::Number(event.thread_id.into()),
        );
        if let Some(ref name) = event.thread_name {
            fields.insert(
                "thread_name".to_string(),
                serde_json::Value::String(name.clone()),
            );
        }
        if !event.location.is_empty() {
            fields.insert(
                "file".to_string(),
                serde_json::Value::String(event.location.short_file().to_string()),
            );
            fields.insert(
                "line".to_string(),
                serde_json::Value::Number(event.location.line.into()),
            );
            fields.insert(
                "function".to_string(),
                serde_json::Value::String(event.location.function.to_string()),
            );
        }
        fields.insert(
            "message".to_string(),
            serde_json::Value::String(event.message().to_string()),
        );

        let value = serde_json::Value::Object(fields);
        let mut rendered = if self.pretty {
            serde_json::to_string_pretty(&value).unwrap_or_default()
        } else {
            serde_json::to_string(&value).unwrap_or_default()
        };
        rendered.push('\n');
        rendered
    }

    fn clone_formatter(&self) -> Arc<dyn Formatter> {
        Arc::new(self.clone())
    }
}
