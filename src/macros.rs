//! Logging macros for ergonomic log message formatting.
//!
//! Every macro takes a trace context followed by `format!`-style arguments.
//! Prefix the context with `logger =>` to target a specific logger; without
//! it the process-wide logger is used. Arguments are only rendered when the
//! level is enabled.
//!
//! # Examples
//!
//! ```
//! use trace_logger::prelude::*;
//! use trace_logger::info;
//!
//! let logger = Logger::new();
//! let ctx = TraceContext::background();
//!
//! let port = 8080;
//! info!(logger => &ctx, "Server listening on port {}", port);
//!
//! // Process-wide logger
//! info!(&ctx, "Server started");
//! ```

/// Log a message at an explicit level.
///
/// ```
/// # use trace_logger::prelude::*;
/// # let logger = Logger::new();
/// # let ctx = TraceContext::background();
/// use trace_logger::log;
/// log!(logger => &ctx, LogLevel::Info, "Simple message");
/// log!(&ctx, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr => $ctx:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_fmt($ctx, $level, format_args!($($arg)+))
    };
    ($ctx:expr, $level:expr, $($arg:tt)+) => {
        $crate::global::log_fmt($ctx, $level, format_args!($($arg)+))
    };
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr => $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger => $ctx, $crate::LogLevel::Trace, $($arg)+)
    };
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr => $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger => $ctx, $crate::LogLevel::Debug, $($arg)+)
    };
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// ```
/// # use trace_logger::prelude::*;
/// # let logger = Logger::new();
/// use trace_logger::info;
/// let ctx = TraceContext::background().with_trace_id("req-7");
/// info!(logger => &ctx, "Request {} completed", 7);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr => $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger => $ctx, $crate::LogLevel::Info, $($arg)+)
    };
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning.
#[macro_export]
macro_rules! warn {
    ($logger:expr => $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger => $ctx, $crate::LogLevel::Warn, $($arg)+)
    };
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error.
#[macro_export]
macro_rules! error {
    ($logger:expr => $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger => $ctx, $crate::LogLevel::Error, $($arg)+)
    };
    ($ctx:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log at fatal level and exit the process with status 1.
#[macro_export]
macro_rules! fatal {
    ($logger:expr => $ctx:expr, $($arg:tt)+) => {
        $logger.fatal_fmt($ctx, format_args!($($arg)+))
    };
    ($ctx:expr, $($arg:tt)+) => {
        $crate::global::fatal_fmt($ctx, format_args!($($arg)+))
    };
}

/// Log at panic level, then panic with the formatted message.
///
/// ```
/// # use trace_logger::prelude::*;
/// # let logger = Logger::new();
/// # let ctx = TraceContext::background();
/// use trace_logger::log_panic;
/// let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
///     log_panic!(logger => &ctx, "invariant broken: {}", 3);
/// }));
/// assert!(result.is_err());
/// ```
#[macro_export]
macro_rules! log_panic {
    ($logger:expr => $ctx:expr, $($arg:tt)+) => {
        $logger.panic_fmt($ctx, format_args!($($arg)+))
    };
    ($ctx:expr, $($arg:tt)+) => {
        $crate::global::panic_fmt($ctx, format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use crate::appenders::{SharedBuffer, WriterAppender};
    use crate::core::{Logger, TraceContext};
    use crate::LogLevel;

    #[test]
    fn test_macros_format_through_explicit_logger() {
        let buffer = SharedBuffer::new();
        let logger = Logger::with_output(Box::new(WriterAppender::new(buffer.clone())));
        logger.set_level(LogLevel::Trace);
        let ctx = TraceContext::background().with_trace_id("m-1");

        trace!(logger => &ctx, "t {}", 1);
        debug!(logger => &ctx, "d {}", 2);
        info!(logger => &ctx, "i {}", 3);
        warn!(logger => &ctx, "w {}", 4);
        error!(logger => &ctx, "e {}", 5);
        log!(logger => &ctx, LogLevel::Info, "plain");

        let messages: Vec<String> = buffer
            .lines()
            .iter()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                assert_eq!(v["trace_id"], "m-1");
                v["message"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(messages, vec!["t 1", "d 2", "i 3", "w 4", "e 5", "plain"]);
    }
}
