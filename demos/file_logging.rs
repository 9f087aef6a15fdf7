//! File logging example
//!
//! Configures the process-wide logger to write JSON lines to a dated file
//! and forwards warnings and errors to a custom hook.
//!
//! Run with: cargo run --example file_logging

use async_trait::async_trait;
use chrono::Local;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trace_logger::appenders::dated_log_path;
use trace_logger::global;
use trace_logger::prelude::*;

/// Counts the entries it receives
struct AlertCounter {
    seen: AtomicUsize,
}

#[async_trait]
impl Hook for AlertCounter {
    fn kind(&self) -> HookKind {
        HookKind::Custom("alert-counter".to_string())
    }

    fn levels(&self) -> &[LogLevel] {
        &[LogLevel::Warn, LogLevel::Error]
    }

    async fn fire(&self, entry: &LogEntry) -> Result<()> {
        self.seen.fetch_add(1, Ordering::Relaxed);
        println!("   hook received: [{}] {}", entry.level, entry.message);
        Ok(())
    }
}

fn main() -> Result<()> {
    println!("=== trace_logger - File Logging Example ===\n");

    let base = std::env::temp_dir().join("trace_logger_demo.log");
    let config = LoggerConfig::new()
        .with_level(LogLevel::Debug)
        .with_output_file(&base);

    let guard = global::init(&config)?;
    global::set_version("1.0.0");

    let counter = Arc::new(AlertCounter {
        seen: AtomicUsize::new(0),
    });
    global::add_hook(counter.clone())?;

    println!("1. Logging to the dated file:");
    let ctx = TraceContext::background().with_trace_id("demo-request");
    global::info(&ctx, "Application started");
    global::with_fields(&ctx, Fields::new().with_field("items", 5)).info("Loading batch");

    for i in 1..=5 {
        global::info(&ctx, format!("Processing item {}/5", i));
        if i == 3 {
            global::warn(&ctx, "Item 3 took longer than expected");
        }
    }
    global::error(&ctx, "Failed to load optional plugin");

    println!("\n2. Waiting for hook delivery:");
    global::standard_logger().drain_hooks(Duration::from_secs(2));
    println!("   alerts seen: {}", counter.seen.load(Ordering::Relaxed));

    guard.teardown()?;

    println!("\n=== Example completed successfully! ===");
    println!(
        "Check '{}' for the full log output",
        dated_log_path(&base, Local::now().date_naive()).display()
    );

    Ok(())
}
