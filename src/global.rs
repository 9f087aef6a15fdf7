//! Process-wide logger
//!
//! [`standard_logger`] is created on first use with the defaults (info level,
//! JSON on stderr). [`init`] applies a configuration to it exactly once per
//! process; the free functions below emit through it.
//!
//! ```no_run
//! use trace_logger::config::LoggerConfig;
//! use trace_logger::core::TraceContext;
//! use trace_logger::global;
//!
//! fn main() -> trace_logger::Result<()> {
//!     let _guard = global::init(&LoggerConfig::new().with_output_file("/var/log/app.log"))?;
//!     global::set_version("1.0.0");
//!
//!     let ctx = TraceContext::background();
//!     global::info(&ctx, "service started");
//!     Ok(())
//! }
//! ```

use crate::config::LoggerConfig;
use crate::core::{
    Appender, Entry, Fields, LogLevel, Logger, LoggerError, LoggerGuard, Result, TraceContext,
};
use crate::hooks::Hook;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static STANDARD_LOGGER: OnceLock<Logger> = OnceLock::new();
static INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn standard_logger() -> &'static Logger {
    STANDARD_LOGGER.get_or_init(Logger::new)
}

/// Configure the process-wide logger
///
/// Only the first successful call takes effect; later calls return
/// [`LoggerError::AlreadyInitialized`]. A call that fails may be retried.
pub fn init(config: &LoggerConfig) -> Result<LoggerGuard> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(LoggerError::AlreadyInitialized);
    }

    standard_logger().configure(config).inspect_err(|_| {
        INITIALIZED.store(false, Ordering::SeqCst);
    })
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

pub fn set_version(version: impl Into<String>) {
    standard_logger().set_version(version);
}

pub fn set_output(sink: Box<dyn Appender>) {
    standard_logger().set_output(sink);
}

pub fn add_hook(hook: Arc<dyn Hook>) -> Result<()> {
    standard_logger().add_hook(hook)
}

pub fn register_hook(hook: Arc<dyn Hook>) -> Result<bool> {
    standard_logger().register_hook(hook)
}

pub fn with_fields(ctx: &TraceContext, fields: Fields) -> Entry<'static> {
    standard_logger().with_fields(ctx, fields)
}

pub fn log(ctx: &TraceContext, level: LogLevel, message: impl Into<String>) {
    standard_logger().log(ctx, level, message);
}

pub fn log_fmt(ctx: &TraceContext, level: LogLevel, args: fmt::Arguments<'_>) {
    standard_logger().log_fmt(ctx, level, args);
}

pub fn trace(ctx: &TraceContext, message: impl Into<String>) {
    standard_logger().trace(ctx, message);
}

pub fn debug(ctx: &TraceContext, message: impl Into<String>) {
    standard_logger().debug(ctx, message);
}

pub fn info(ctx: &TraceContext, message: impl Into<String>) {
    standard_logger().info(ctx, message);
}

pub fn warn(ctx: &TraceContext, message: impl Into<String>) {
    standard_logger().warn(ctx, message);
}

pub fn error(ctx: &TraceContext, message: impl Into<String>) {
    standard_logger().error(ctx, message);
}

pub fn trace_fmt(ctx: &TraceContext, args: fmt::Arguments<'_>) {
    standard_logger().trace_fmt(ctx, args);
}

pub fn debug_fmt(ctx: &TraceContext, args: fmt::Arguments<'_>) {
    standard_logger().debug_fmt(ctx, args);
}

pub fn info_fmt(ctx: &TraceContext, args: fmt::Arguments<'_>) {
    standard_logger().info_fmt(ctx, args);
}

pub fn warn_fmt(ctx: &TraceContext, args: fmt::Arguments<'_>) {
    standard_logger().warn_fmt(ctx, args);
}

pub fn error_fmt(ctx: &TraceContext, args: fmt::Arguments<'_>) {
    standard_logger().error_fmt(ctx, args);
}

pub fn fatal(ctx: &TraceContext, message: impl Into<String>) -> ! {
    standard_logger().fatal(ctx, message)
}

pub fn fatal_fmt(ctx: &TraceContext, args: fmt::Arguments<'_>) -> ! {
    standard_logger().fatal_fmt(ctx, args)
}

pub fn panic(ctx: &TraceContext, message: impl Into<String>) -> ! {
    standard_logger().panic(ctx, message)
}

pub fn panic_fmt(ctx: &TraceContext, args: fmt::Arguments<'_>) -> ! {
    standard_logger().panic_fmt(ctx, args)
}
