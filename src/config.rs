//! Logger configuration
//!
//! Loaded from TOML or assembled with the `with_*` builders:
//!
//! ```toml
//! level = "info"
//! format = "json"
//! output = "file"
//! output_file = "/var/log/app.log"
//! index_name = "app-logs"
//!
//! [meilisearch]
//! host = "http://127.0.0.1:7700"
//! api_key = "masterKey"
//!
//! [elasticsearch]
//! addresses = ["http://127.0.0.1:9200"]
//! username = "elastic"
//! password = "changeme"
//! ```

use crate::appenders::rotating_file::DEFAULT_FILE_MODE;
use crate::appenders::rotation::DEFAULT_ROTATION_INTERVAL;
use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use crate::core::output_format::OutputFormat;
use crate::hooks::dispatcher::{DEFAULT_HOOK_QUEUE_CAPACITY, DEFAULT_HOOK_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where formatted lines go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputTarget {
    Stdout,
    #[default]
    Stderr,
    File,
}

/// `"stdout"` and `"file"` select those targets; anything else is stderr.
impl From<&str> for OutputTarget {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "stdout" => OutputTarget::Stdout,
            "file" => OutputTarget::File,
            _ => OutputTarget::Stderr,
        }
    }
}

impl From<String> for OutputTarget {
    fn from(value: String) -> Self {
        OutputTarget::from(value.as_str())
    }
}

impl From<OutputTarget> for String {
    fn from(target: OutputTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => write!(f, "stdout"),
            OutputTarget::Stderr => write!(f, "stderr"),
            OutputTarget::File => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeilisearchConfig {
    pub host: String,
    pub api_key: String,
}

impl MeilisearchConfig {
    pub fn is_enabled(&self) -> bool {
        !self.host.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub addresses: Vec<String>,
    pub username: String,
    pub password: String,
}

impl ElasticsearchConfig {
    pub fn is_enabled(&self) -> bool {
        !self.addresses.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub format: OutputFormat,
    pub output: OutputTarget,
    /// Base path for file output; the active file carries the date
    pub output_file: PathBuf,
    /// Index that both remote indexers write to
    pub index_name: String,
    pub meilisearch: MeilisearchConfig,
    pub elasticsearch: ElasticsearchConfig,
    pub rotation_interval_secs: u64,
    pub file_mode: u32,
    pub hook_queue_capacity: usize,
    pub hook_timeout_ms: u64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: OutputFormat::Json,
            output: OutputTarget::Stderr,
            output_file: PathBuf::new(),
            index_name: String::new(),
            meilisearch: MeilisearchConfig::default(),
            elasticsearch: ElasticsearchConfig::default(),
            rotation_interval_secs: DEFAULT_ROTATION_INTERVAL.as_secs(),
            file_mode: DEFAULT_FILE_MODE,
            hook_queue_capacity: DEFAULT_HOOK_QUEUE_CAPACITY,
            hook_timeout_ms: DEFAULT_HOOK_TIMEOUT.as_millis() as u64,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logger configuration",
                format!("cannot read '{}'", path.display()),
                e,
            )
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    /// File output at `path`
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = OutputTarget::File;
        self.output_file = path.into();
        self
    }

    #[must_use]
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    #[must_use]
    pub fn with_meilisearch(mut self, host: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.meilisearch = MeilisearchConfig {
            host: host.into(),
            api_key: api_key.into(),
        };
        self
    }

    #[must_use]
    pub fn with_elasticsearch<I, S>(
        mut self,
        addresses: I,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elasticsearch = ElasticsearchConfig {
            addresses: addresses.into_iter().map(Into::into).collect(),
            username: username.into(),
            password: password.into(),
        };
        self
    }

    #[must_use]
    pub fn with_rotation_interval(mut self, interval: Duration) -> Self {
        self.rotation_interval_secs = interval.as_secs();
        self
    }

    #[must_use]
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    #[must_use]
    pub fn with_hook_queue_capacity(mut self, capacity: usize) -> Self {
        self.hook_queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_secs)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_millis(self.hook_timeout_ms)
    }

    pub fn has_remote_index(&self) -> bool {
        self.meilisearch.is_enabled() || self.elasticsearch.is_enabled()
    }

    /// Check settings that can be verified without touching the filesystem
    /// or the network
    pub fn validate(&self) -> Result<()> {
        if self.output == OutputTarget::File && self.output_file.as_os_str().is_empty() {
            return Err(LoggerError::config(
                "output",
                "file output requires output_file",
            ));
        }
        if self.rotation_interval_secs == 0 {
            return Err(LoggerError::config(
                "rotation",
                "rotation_interval_secs must be greater than zero",
            ));
        }
        if self.hook_queue_capacity == 0 {
            return Err(LoggerError::config(
                "hooks",
                "hook_queue_capacity must be greater than zero",
            ));
        }
        if self.hook_timeout_ms == 0 {
            return Err(LoggerError::config(
                "hooks",
                "hook_timeout_ms must be greater than zero",
            ));
        }
        if self.has_remote_index() && self.index_name.trim().is_empty() {
            return Err(LoggerError::config(
                "index_name",
                "an index name is required when a remote indexer is configured",
            ));
        }
        if self.elasticsearch.addresses.iter().any(|a| a.trim().is_empty()) {
            return Err(LoggerError::config(
                "elasticsearch",
                "addresses must not contain empty entries",
            ));
        }
        Ok(())
    }
}
