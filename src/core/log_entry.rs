//! Log entry structure

use super::fields::Fields;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Keys the formatter writes itself; caller fields with these names are
/// emitted under a `fields.` prefix instead.
pub const RESERVED_KEYS: [&str; 3] = ["timestamp", "level", "message"];

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub fields: Fields,
}

impl LogEntry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so that every entry stays on a single line.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, message: String) -> Self {
        Self {
            level,
            message: Self::sanitize_message(&message),
            timestamp: Utc::now(),
            fields: Fields::new(),
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Document submitted to remote indexers: every field plus the
    /// message and level.
    pub fn document(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut doc = serde_json::Map::new();
        for (key, value) in self.fields.iter() {
            doc.insert(Self::field_key(key), value.to_json_value());
        }
        doc.insert(
            "message".to_string(),
            serde_json::Value::String(self.message.clone()),
        );
        doc.insert(
            "level".to_string(),
            serde_json::Value::String(self.level.to_str().to_string()),
        );
        doc
    }

    /// Output key for a caller field, prefixed when it clashes with a
    /// reserved key.
    pub(crate) fn field_key(key: &str) -> String {
        if RESERVED_KEYS.contains(&key) {
            format!("fields.{}", key)
        } else {
            key.to_string()
        }
    }
}
