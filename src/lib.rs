//! # Trace Logger
//!
//! Process-wide structured logging with request trace correlation.
//!
//! ## Features
//!
//! - **Trace correlation**: every entry carries the `trace_id` bound to the
//!   caller's [`TraceContext`], generating one when absent
//! - **Daily files**: file output goes to `<base>.<YYYY-MM-DD>.log`, rotated
//!   by a background task without splitting or losing lines
//! - **Search-index hooks**: optional Meilisearch and Elasticsearch delivery
//!   off the calling thread, best effort and bounded in time
//! - **One-shot initialization**: [`global::init`] configures the process
//!   logger once and returns a teardown guard
//!
//! ```no_run
//! use trace_logger::prelude::*;
//!
//! fn main() -> trace_logger::Result<()> {
//!     let config = LoggerConfig::new()
//!         .with_output_file("/tmp/app.log")
//!         .with_index_name("app-logs")
//!         .with_meilisearch("http://127.0.0.1:7700", "masterKey");
//!     let _guard = trace_logger::global::init(&config)?;
//!
//!     let ctx = TraceContext::background();
//!     trace_logger::info!(&ctx, "listening on {}", 8080);
//!     Ok(())
//! }
//! ```

pub mod appenders;
pub mod config;
pub mod core;
pub mod global;
pub mod hooks;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{ConsoleAppender, DailyFileAppender, SharedBuffer, WriterAppender};
    pub use crate::config::{LoggerConfig, OutputTarget};
    pub use crate::core::{
        Appender, Entry, FieldValue, Fields, LogEntry, LogLevel, Logger, LoggerError,
        LoggerGuard, LoggerMetrics, OutputFormat, Result, TimestampFormat, TraceContext,
        DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::hooks::{Hook, HookKind};
}

pub use appenders::{ConsoleAppender, DailyFileAppender, WriterAppender};
pub use config::LoggerConfig;
pub use core::{
    get_or_create_trace_id, Appender, Entry, FieldValue, Fields, LogEntry, LogLevel, Logger,
    LoggerError, LoggerGuard, LoggerMetrics, OutputFormat, Result, TimestampFormat, TraceContext,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use hooks::{Hook, HookKind, HookRegistry};
