//! Core logger types and traits

pub mod appender;
pub mod error;
pub mod fields;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod timestamp;
pub mod trace;

pub use appender::Appender;
pub use error::{LoggerError, Result};
pub use fields::{FieldValue, Fields};
pub use log_entry::{LogEntry, RESERVED_KEYS};
pub use log_level::LogLevel;
pub use logger::{Entry, Logger, LoggerGuard, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use output_format::OutputFormat;
pub use timestamp::TimestampFormat;
pub use trace::{get_or_create_trace_id, new_trace_id, TraceContext};
