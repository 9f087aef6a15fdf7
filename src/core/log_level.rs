//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log entry, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
#[serde(try_from = "LevelSetting", into = "String")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
    Panic = 6,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
        LogLevel::Panic,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Panic => "panic",
        }
    }

    /// Map a numeric severity (0 = panic .. 6 = trace) to a level.
    ///
    /// This is the ordinal scheme used by configuration files that express
    /// the level as a number.
    pub fn from_severity(severity: u8) -> Option<Self> {
        match severity {
            0 => Some(LogLevel::Panic),
            1 => Some(LogLevel::Fatal),
            2 => Some(LogLevel::Error),
            3 => Some(LogLevel::Warn),
            4 => Some(LogLevel::Info),
            5 => Some(LogLevel::Debug),
            6 => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Numeric severity of this level (inverse of [`LogLevel::from_severity`]).
    pub fn severity(&self) -> u8 {
        6 - *self as u8
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "panic" => Ok(LogLevel::Panic),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_str().to_string()
    }
}

/// Accepted configuration spellings of a level: a name or a severity ordinal.
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelSetting {
    Name(String),
    Severity(u8),
}

impl TryFrom<LevelSetting> for LogLevel {
    type Error = String;

    fn try_from(setting: LevelSetting) -> Result<Self, String> {
        match setting {
            LevelSetting::Name(name) => name.parse(),
            LevelSetting::Severity(severity) => LogLevel::from_severity(severity)
                .ok_or_else(|| format!("Invalid log level severity: {}", severity)),
        }
    }
}
