//! Background delivery of entries to registered hooks
//!
//! Emission threads hand entries to a bounded queue and return immediately.
//! A single worker thread drains the queue on its own current-thread tokio
//! runtime and fires every matching hook concurrently. A full queue drops the
//! entry instead of blocking the caller.

use super::{Hook, HookRegistry};
use crate::core::error::{LoggerError, Result};
use crate::core::log_entry::LogEntry;
use crate::core::log_level::LogLevel;
use crate::core::logger::DEFAULT_SHUTDOWN_TIMEOUT;
use crate::core::metrics::LoggerMetrics;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

pub const DEFAULT_HOOK_QUEUE_CAPACITY: usize = 1024;

/// Upper bound for a single hook call
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HookDispatcher {
    sender: Option<Sender<LogEntry>>,
    handle: Option<thread::JoinHandle<()>>,
    /// Entries queued or being delivered
    in_flight: Arc<AtomicUsize>,
    metrics: Arc<LoggerMetrics>,
}

impl HookDispatcher {
    /// Start the worker thread
    ///
    /// `level` is the logger's live level; delivery failures are printed only
    /// while it is at Debug or below.
    pub fn spawn(
        registry: HookRegistry,
        capacity: usize,
        hook_timeout: Duration,
        level: Arc<RwLock<LogLevel>>,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config(
                "hooks",
                "hook queue capacity must be greater than zero",
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                LoggerError::io_operation("building hook runtime", "tokio runtime failed", e)
            })?;

        let (sender, receiver) = bounded(capacity);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker = Worker {
            registry,
            hook_timeout,
            level,
            metrics: Arc::clone(&metrics),
            in_flight: Arc::clone(&in_flight),
        };

        let handle = thread::Builder::new()
            .name("log-hooks".to_string())
            .spawn(move || worker.run(&runtime, receiver))
            .map_err(|e| {
                LoggerError::io_operation("spawning hook worker", "thread spawn failed", e)
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            in_flight,
            metrics,
        })
    }

    /// Queue an entry for delivery without blocking
    pub fn dispatch(&self, entry: LogEntry) {
        let Some(ref sender) = self.sender else {
            return;
        };

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        match sender.try_send(entry) {
            Ok(()) => {
                self.metrics.record_hook_queued();
            }
            Err(TrySendError::Full(_)) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.alert_and_drop();
            }
            Err(TrySendError::Disconnected(_)) => {
                // Worker gone, shutting down
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    fn alert_and_drop(&self) {
        let dropped_count = self.metrics.record_hook_dropped();

        // Alert on first drop and periodically thereafter
        if dropped_count == 0 || (dropped_count + 1).is_multiple_of(1000) {
            eprintln!(
                "[LOGGER WARNING] Hook queue full, {} entries dropped. \
                 Remote indexers are not keeping up.",
                dropped_count + 1
            );
        }
    }

    /// Number of entries queued or being delivered
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait until every queued entry has been delivered, keeping the worker
    /// running. Returns `false` on timeout.
    pub fn drain(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.pending() > 0 {
            if !self.is_running() {
                return false;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }

    /// Close the queue and wait for the worker to deliver what is left
    ///
    /// Returns `true` if the worker finished within `timeout`.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        // Closing the channel lets the worker drain and exit
        drop(self.sender.take());

        let Some(handle) = self.handle.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!("[LOGGER ERROR] Hook worker panicked during shutdown: {:?}", e);
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Hook worker did not finish within timeout. \
                     {} entries may not reach remote indexers.",
                    self.pending()
                );
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for HookDispatcher {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

struct Worker {
    registry: HookRegistry,
    hook_timeout: Duration,
    level: Arc<RwLock<LogLevel>>,
    metrics: Arc<LoggerMetrics>,
    in_flight: Arc<AtomicUsize>,
}

impl Worker {
    fn run(self, runtime: &tokio::runtime::Runtime, receiver: Receiver<LogEntry>) {
        while let Ok(entry) = receiver.recv() {
            let hooks = self.registry.snapshot();
            runtime.block_on(self.deliver(hooks, Arc::new(entry)));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    async fn deliver(&self, hooks: Vec<Arc<dyn Hook>>, entry: Arc<LogEntry>) {
        let mut tasks = JoinSet::new();
        let hook_timeout = self.hook_timeout;

        for hook in hooks {
            if !hook.levels().contains(&entry.level) {
                continue;
            }
            let entry = Arc::clone(&entry);
            tasks.spawn(async move {
                let kind = hook.kind();
                let result = match tokio::time::timeout(hook_timeout, hook.fire(&entry)).await {
                    Ok(result) => result,
                    Err(_) => Err(LoggerError::hook(
                        kind.to_string(),
                        format!("timed out after {:?}", hook_timeout),
                    )),
                };
                (kind, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((kind, Err(e))) => self.report(&kind.to_string(), &e.to_string()),
                Err(join_err) => {
                    let message = if join_err.is_panic() {
                        "panicked during delivery".to_string()
                    } else {
                        join_err.to_string()
                    };
                    self.report("unknown", &message);
                }
            }
        }
    }

    fn report(&self, hook: &str, message: &str) {
        self.metrics.record_hook_failure();
        if *self.level.read() <= LogLevel::Debug {
            eprintln!("[LOGGER DEBUG] Hook '{}' failed: {}", hook, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookKind;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Recording {
        name: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Hook for Recording {
        fn kind(&self) -> HookKind {
            HookKind::Custom(self.name.to_string())
        }

        async fn fire(&self, entry: &LogEntry) -> Result<()> {
            self.seen.lock().push(entry.message.clone());
            Ok(())
        }
    }

    struct ErrorsOnly;

    #[async_trait]
    impl Hook for ErrorsOnly {
        fn kind(&self) -> HookKind {
            HookKind::Custom("errors-only".to_string())
        }

        fn levels(&self) -> &[LogLevel] {
            &[LogLevel::Error]
        }

        async fn fire(&self, _entry: &LogEntry) -> Result<()> {
            Err(LoggerError::hook("errors-only", "rejected"))
        }
    }

    struct Sleepy;

    #[async_trait]
    impl Hook for Sleepy {
        fn kind(&self) -> HookKind {
            HookKind::Custom("sleepy".to_string())
        }

        async fn fire(&self, _entry: &LogEntry) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    struct Panicky;

    #[async_trait]
    impl Hook for Panicky {
        fn kind(&self) -> HookKind {
            HookKind::Custom("panicky".to_string())
        }

        async fn fire(&self, _entry: &LogEntry) -> Result<()> {
            panic!("hook exploded");
        }
    }

    fn spawn(registry: &HookRegistry, capacity: usize, timeout: Duration) -> HookDispatcher {
        HookDispatcher::spawn(
            registry.clone(),
            capacity,
            timeout,
            Arc::new(RwLock::new(LogLevel::Info)),
            Arc::new(LoggerMetrics::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_entries_reach_every_hook() {
        let registry = HookRegistry::new();
        let a = Recording::new("a");
        let b = Recording::new("b");
        registry.register(a.clone());
        registry.register(b.clone());

        let dispatcher = spawn(&registry, 16, DEFAULT_HOOK_TIMEOUT);
        for i in 0..5 {
            dispatcher.dispatch(LogEntry::new(LogLevel::Info, format!("msg {}", i)));
        }
        assert!(dispatcher.drain(Duration::from_secs(5)));

        assert_eq!(a.seen.lock().len(), 5);
        assert_eq!(b.seen.lock().len(), 5);
        assert_eq!(dispatcher.metrics.hook_entries_queued(), 5);
    }

    #[test]
    fn test_level_filter_and_failure_counting() {
        let registry = HookRegistry::new();
        registry.register(Arc::new(ErrorsOnly));

        let dispatcher = spawn(&registry, 16, DEFAULT_HOOK_TIMEOUT);
        dispatcher.dispatch(LogEntry::new(LogLevel::Info, "skipped".to_string()));
        dispatcher.dispatch(LogEntry::new(LogLevel::Error, "delivered".to_string()));
        assert!(dispatcher.drain(Duration::from_secs(5)));

        assert_eq!(dispatcher.metrics.hook_failures(), 1);
    }

    #[test]
    fn test_slow_hook_is_bounded_by_timeout() {
        let registry = HookRegistry::new();
        let fast = Recording::new("fast");
        registry.register(Arc::new(Sleepy));
        registry.register(fast.clone());

        let dispatcher = spawn(&registry, 16, Duration::from_millis(50));
        dispatcher.dispatch(LogEntry::new(LogLevel::Info, "one".to_string()));
        assert!(dispatcher.drain(Duration::from_secs(5)));

        assert_eq!(fast.seen.lock().len(), 1);
        assert_eq!(dispatcher.metrics.hook_failures(), 1);
    }

    #[test]
    fn test_panicking_hook_is_isolated() {
        let registry = HookRegistry::new();
        let healthy = Recording::new("healthy");
        registry.register(Arc::new(Panicky));
        registry.register(healthy.clone());

        let dispatcher = spawn(&registry, 16, DEFAULT_HOOK_TIMEOUT);
        dispatcher.dispatch(LogEntry::new(LogLevel::Info, "first".to_string()));
        dispatcher.dispatch(LogEntry::new(LogLevel::Info, "second".to_string()));
        assert!(dispatcher.drain(Duration::from_secs(5)));

        assert!(dispatcher.is_running());
        assert_eq!(healthy.seen.lock().len(), 2);
        assert_eq!(dispatcher.metrics.hook_failures(), 2);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let registry = HookRegistry::new();
        registry.register(Arc::new(Sleepy));

        let dispatcher = spawn(&registry, 1, Duration::from_millis(200));
        let start = Instant::now();
        for i in 0..20 {
            dispatcher.dispatch(LogEntry::new(LogLevel::Info, format!("msg {}", i)));
        }
        assert!(start.elapsed() < Duration::from_millis(200));
        assert!(dispatcher.metrics.hook_entries_dropped() > 0);
        assert_eq!(
            dispatcher.metrics.hook_entries_queued() + dispatcher.metrics.hook_entries_dropped(),
            20
        );
    }

    #[test]
    fn test_shutdown_delivers_queued_entries() {
        let registry = HookRegistry::new();
        let hook = Recording::new("a");
        registry.register(hook.clone());

        let mut dispatcher = spawn(&registry, 64, DEFAULT_HOOK_TIMEOUT);
        for i in 0..50 {
            dispatcher.dispatch(LogEntry::new(LogLevel::Info, format!("msg {}", i)));
        }
        assert!(dispatcher.shutdown(Duration::from_secs(5)));
        assert_eq!(hook.seen.lock().len(), 50);

        // Dispatch after shutdown is a no-op
        dispatcher.dispatch(LogEntry::new(LogLevel::Info, "late".to_string()));
        assert_eq!(hook.seen.lock().len(), 50);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = HookDispatcher::spawn(
            HookRegistry::new(),
            0,
            DEFAULT_HOOK_TIMEOUT,
            Arc::new(RwLock::new(LogLevel::Info)),
            Arc::new(LoggerMetrics::new()),
        );
        assert!(matches!(
            result,
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }
}
