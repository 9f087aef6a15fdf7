//! Logger metrics for observability
//!
//! Counters for sink writes, hook delivery, and file rotation. All counters
//! use relaxed atomics; values are monotonic between resets.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use trace_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_written();
/// metrics.record_hook_dropped();
///
/// assert_eq!(metrics.entries_written(), 1);
/// assert_eq!(metrics.hook_entries_dropped(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Entries written to the sink
    entries_written: AtomicU64,

    /// Sink writes that failed and fell back to stderr
    write_failures: AtomicU64,

    /// Entries handed to the hook dispatcher
    hook_entries_queued: AtomicU64,

    /// Entries dropped because the hook queue was full
    hook_entries_dropped: AtomicU64,

    /// Individual hook deliveries that failed or timed out
    hook_failures: AtomicU64,

    /// Successful rotations to a new dated file
    rotations: AtomicU64,

    /// Rotation attempts that failed
    rotation_failures: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            entries_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            hook_entries_queued: AtomicU64::new(0),
            hook_entries_dropped: AtomicU64::new(0),
            hook_failures: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            rotation_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn entries_written(&self) -> u64 {
        self.entries_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn hook_entries_queued(&self) -> u64 {
        self.hook_entries_queued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn hook_entries_dropped(&self) -> u64 {
        self.hook_entries_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn hook_failures(&self) -> u64 {
        self.hook_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rotation_failures(&self) -> u64 {
        self.rotation_failures.load(Ordering::Relaxed)
    }

    /// Returns the previous value
    #[inline]
    pub fn record_written(&self) -> u64 {
        self.entries_written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_failure(&self) -> u64 {
        self.write_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_hook_queued(&self) -> u64 {
        self.hook_entries_queued.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the previous value, used to throttle overflow alerts
    #[inline]
    pub fn record_hook_dropped(&self) -> u64 {
        self.hook_entries_dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_hook_failure(&self) -> u64 {
        self.hook_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rotation(&self) -> u64 {
        self.rotations.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rotation_failure(&self) -> u64 {
        self.rotation_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of hook entries dropped, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing was offered to the hooks.
    pub fn hook_drop_rate(&self) -> f64 {
        let dropped = self.hook_entries_dropped() as f64;
        let total = self.hook_entries_queued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.entries_written.store(0, Ordering::Relaxed);
        self.write_failures.store(0, Ordering::Relaxed);
        self.hook_entries_queued.store(0, Ordering::Relaxed);
        self.hook_entries_dropped.store(0, Ordering::Relaxed);
        self.hook_failures.store(0, Ordering::Relaxed);
        self.rotations.store(0, Ordering::Relaxed);
        self.rotation_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            entries_written: AtomicU64::new(self.entries_written()),
            write_failures: AtomicU64::new(self.write_failures()),
            hook_entries_queued: AtomicU64::new(self.hook_entries_queued()),
            hook_entries_dropped: AtomicU64::new(self.hook_entries_dropped()),
            hook_failures: AtomicU64::new(self.hook_failures()),
            rotations: AtomicU64::new(self.rotations()),
            rotation_failures: AtomicU64::new(self.rotation_failures()),
        }
    }
}
