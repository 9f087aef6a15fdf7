//! Output format configuration for log entries
//!
//! - Json: one JSON object per line (default)
//! - Text: logfmt-style `key=value` pairs

use super::fields::FieldValue;
use super::log_entry::LogEntry;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format for log entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    /// Example: `{"level":"info","message":"Request processed","timestamp":"2025-01-08T10:30:45Z","trace_id":"..."}`
    #[default]
    Json,

    /// Example: `timestamp=2025-01-08T10:30:45Z level=info message="Request processed" trace_id=...`
    Text,
}

impl OutputFormat {
    /// Format a log entry as a single line without the trailing newline
    pub fn format(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Json => self.format_json(entry, timestamp_format),
            OutputFormat::Text => self.format_text(entry, timestamp_format),
        }
    }

    fn format_json(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> String {
        let mut json_obj = entry.document();
        json_obj.insert(
            "timestamp".to_string(),
            timestamp_format.to_json_value(&entry.timestamp),
        );

        serde_json::to_string(&serde_json::Value::Object(json_obj)).unwrap_or_default()
    }

    fn format_text(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> String {
        let mut parts = Vec::with_capacity(entry.fields.len() + 3);

        parts.push(format!(
            "timestamp={}",
            self.escape_logfmt_value(&timestamp_format.format(&entry.timestamp))
        ));
        parts.push(format!("level={}", entry.level.to_str()));
        // Message is always quoted
        parts.push(format!("message={}", self.quote_logfmt_value(&entry.message)));

        for (key, value) in entry.fields.iter() {
            let formatted_value = match value {
                FieldValue::String(s) => self.escape_logfmt_value(s),
                other => other.to_string(),
            };
            parts.push(format!(
                "{}={}",
                self.escape_logfmt_key(&LogEntry::field_key(key)),
                formatted_value
            ));
        }

        parts.join(" ")
    }

    /// Escape a logfmt key (remove spaces and special chars)
    fn escape_logfmt_key(&self, key: &str) -> String {
        key.chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
            .collect()
    }

    /// Escape a logfmt value (quote if contains spaces)
    fn escape_logfmt_value(&self, value: &str) -> String {
        if value.is_empty() || value.contains([' ', '"', '=', '\n', '\r']) {
            self.quote_logfmt_value(value)
        } else {
            value.to_string()
        }
    }

    fn quote_logfmt_value(&self, value: &str) -> String {
        format!(
            "\"{}\"",
            value
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n")
                .replace('\r', "\\r")
        )
    }
}

/// `"json"` selects JSON; every other value selects text.
impl From<String> for OutputFormat {
    fn from(value: String) -> Self {
        OutputFormat::from(value.as_str())
    }
}

impl From<&str> for OutputFormat {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}
