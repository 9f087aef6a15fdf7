//! Main logger implementation

use super::{
    appender::Appender,
    error::Result,
    fields::{FieldValue, Fields},
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    output_format::OutputFormat,
    timestamp::TimestampFormat,
    trace::{
        get_or_create_trace_id, TraceContext, SPAN_FUNCTION_KEY, SPAN_TITLE_KEY, TRACE_ID_KEY,
        VERSION_KEY,
    },
};
use crate::appenders::{
    dated_log_path, ConsoleAppender, DailyFileAppender, FileRotator, RotationOutcome,
    RotationTask,
};
use crate::config::{LoggerConfig, OutputTarget};
use crate::hooks::{
    Hook, HookDispatcher, HookRegistry, DEFAULT_HOOK_QUEUE_CAPACITY, DEFAULT_HOOK_TIMEOUT,
};
use chrono::Local;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// Bounds how long teardown, `fatal` and `panic` wait for queued hook
/// deliveries.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct LoggerInner {
    level: Arc<RwLock<LogLevel>>,
    format: RwLock<OutputFormat>,
    timestamp_format: RwLock<TimestampFormat>,
    sink: Mutex<Box<dyn Appender>>,
    hooks: HookRegistry,
    dispatcher: RwLock<Option<HookDispatcher>>,
    version: RwLock<Option<String>>,
    rotation: Mutex<Option<RotationTask>>,
    /// Rotation handle of the installed file sink, if any
    active_file: Mutex<Option<FileRotator>>,
    /// Bumped each time a new sink configuration is installed; a guard only
    /// tears down the generation it created
    generation: Mutex<u64>,
    metrics: Arc<LoggerMetrics>,
}

impl LoggerInner {
    fn is_enabled(&self, level: LogLevel) -> bool {
        // Fatal and panic always reach the sink before terminating
        level >= LogLevel::Fatal || level >= *self.level.read()
    }

    fn build_entry(
        &self,
        ctx: &TraceContext,
        level: LogLevel,
        message: String,
        mut fields: Fields,
    ) -> LogEntry {
        let (_, trace_id) = get_or_create_trace_id(ctx);
        fields.insert(TRACE_ID_KEY, trace_id);
        if let Some(ref version) = *self.version.read() {
            fields.insert(VERSION_KEY, version.clone());
        }
        if let Some(title) = ctx.value(SPAN_TITLE_KEY) {
            fields.insert_if_absent(SPAN_TITLE_KEY, title);
        }
        if let Some(function) = ctx.value(SPAN_FUNCTION_KEY) {
            fields.insert_if_absent(SPAN_FUNCTION_KEY, function);
        }

        LogEntry::new(level, message).with_fields(fields)
    }

    fn emit(&self, ctx: &TraceContext, level: LogLevel, message: String, fields: Fields) {
        if !self.is_enabled(level) {
            return;
        }
        let entry = self.build_entry(ctx, level, message, fields);
        self.write_entry(entry);
    }

    fn write_entry(&self, entry: LogEntry) {
        let line = self
            .format
            .read()
            .format(&entry, &self.timestamp_format.read());

        {
            let mut sink = self.sink.lock();
            match sink.append(&line) {
                Ok(()) => {
                    self.metrics.record_written();
                }
                Err(e) => {
                    self.metrics.record_write_failure();
                    eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", sink.name(), e);
                    eprintln!("{}", line);
                }
            }
        }

        if self.hooks.is_empty() {
            return;
        }
        if let Some(ref dispatcher) = *self.dispatcher.read() {
            dispatcher.dispatch(entry);
        }
    }

    /// Start the hook worker unless one is already running
    fn ensure_dispatcher(&self, capacity: usize, hook_timeout: Duration) -> Result<()> {
        let mut slot = self.dispatcher.write();
        if slot.as_ref().is_some_and(HookDispatcher::is_running) {
            return Ok(());
        }
        *slot = Some(HookDispatcher::spawn(
            self.hooks.clone(),
            capacity,
            hook_timeout,
            Arc::clone(&self.level),
            Arc::clone(&self.metrics),
        )?);
        Ok(())
    }

    fn stop_rotation(&self) {
        let task = self.rotation.lock().take();
        if let Some(task) = task {
            task.stop();
        }
    }

    /// The installed file sink's rotator when `base` names the same dated
    /// files
    fn reusable_file(&self, base: &Path) -> Option<FileRotator> {
        let today = Local::now().date_naive();
        let wanted = dated_log_path(base, today);
        self.active_file
            .lock()
            .as_ref()
            .filter(|r| r.is_open() && dated_log_path(&r.base_path(), today) == wanted)
            .cloned()
    }

    /// Swap in a new sink and close the previous one
    fn replace_sink(&self, sink: Box<dyn Appender>) {
        let mut previous = std::mem::replace(&mut *self.sink.lock(), sink);
        if let Err(e) = previous.close() {
            eprintln!(
                "[LOGGER ERROR] Failed to close previous sink '{}': {}",
                previous.name(),
                e
            );
        }
    }

    fn flush_sink(&self) -> Result<()> {
        self.sink.lock().flush()
    }

    /// Make sure an entry about to end the thread or process is persisted
    fn flush_for_exit(&self) {
        if let Err(e) = self.flush_sink() {
            eprintln!("[LOGGER ERROR] Failed to flush before exit: {}", e);
        }
        if let Some(ref dispatcher) = *self.dispatcher.read() {
            if !dispatcher.drain(DEFAULT_SHUTDOWN_TIMEOUT) {
                eprintln!(
                    "[LOGGER WARNING] {} hook deliveries still pending at exit",
                    dispatcher.pending()
                );
            }
        }
    }

    fn on_rotation(&self, result: Result<RotationOutcome>) {
        match result {
            Ok(RotationOutcome::Rotated { .. }) => {
                self.metrics.record_rotation();
            }
            Ok(RotationOutcome::Unchanged(_)) => {}
            Err(e) => {
                self.metrics.record_rotation_failure();
                self.emit(
                    &TraceContext::background(),
                    LogLevel::Error,
                    format!("Error rotating log: {}", e),
                    Fields::new(),
                );
            }
        }
    }

    /// Tear down `generation`; a no-op once a newer configuration replaced it
    fn teardown(&self, generation: u64) -> Result<()> {
        let current = self.generation.lock();
        if *current != generation {
            return Ok(());
        }

        self.stop_rotation();
        *self.active_file.lock() = None;

        let close_result = {
            let mut sink = self.sink.lock();
            let result = sink.close();
            *sink = Box::new(ConsoleAppender::stderr());
            result
        };

        let dispatcher = self.dispatcher.write().take();
        if let Some(mut dispatcher) = dispatcher {
            dispatcher.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }

        close_result
    }
}

impl Drop for LoggerInner {
    fn drop(&mut self) {
        drop(self.rotation.get_mut().take());

        // Best effort flush - ignore errors during drop
        let _ = self.sink.get_mut().flush();
        // The dispatcher drains itself when its field is dropped
    }
}

/// Cheaply clonable handle to a logger
///
/// Every clone writes to the same sink, hooks and settings.
///
/// # Examples
///
/// ```
/// use trace_logger::appenders::{SharedBuffer, WriterAppender};
/// use trace_logger::core::{Logger, TraceContext};
///
/// let buffer = SharedBuffer::new();
/// let logger = Logger::with_output(Box::new(WriterAppender::new(buffer.clone())));
///
/// let ctx = TraceContext::background().with_trace_id("req-42");
/// logger.info(&ctx, "hello");
///
/// let line: serde_json::Value = serde_json::from_str(&buffer.lines()[0]).unwrap();
/// assert_eq!(line["trace_id"], "req-42");
/// assert_eq!(line["message"], "hello");
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    /// Info level, JSON lines on stderr, no hooks
    #[must_use]
    pub fn new() -> Self {
        Self::with_output(Box::new(ConsoleAppender::stderr()))
    }

    #[must_use]
    pub fn with_output(sink: Box<dyn Appender>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                level: Arc::new(RwLock::new(LogLevel::Info)),
                format: RwLock::new(OutputFormat::Json),
                timestamp_format: RwLock::new(TimestampFormat::Rfc3339),
                sink: Mutex::new(sink),
                hooks: HookRegistry::new(),
                dispatcher: RwLock::new(None),
                version: RwLock::new(None),
                rotation: Mutex::new(None),
                active_file: Mutex::new(None),
                generation: Mutex::new(0),
                metrics: Arc::new(LoggerMetrics::new()),
            }),
        }
    }

    /// Apply `config`: level, format, sink and remote indexer hooks
    ///
    /// Everything that can fail (validation, indexer clients, the log file,
    /// background threads) is prepared before the running logger is touched,
    /// so an error leaves the previous configuration active.
    ///
    /// Indexer hooks are registered only if no hook of the same kind is
    /// installed yet. The returned guard must be kept alive for as long as
    /// the configuration should stay in effect; once a later `configure`
    /// replaces it, dropping the older guard does nothing.
    ///
    /// Reconfiguring with the file path already in use keeps the open file
    /// instead of opening a second handle on it; a new `file_mode` applies to
    /// files created by later rotations.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for rejected settings or indexer
    /// addresses, and an IO/file sink error when the log file cannot be
    /// opened.
    pub fn configure(&self, config: &LoggerConfig) -> Result<LoggerGuard> {
        config.validate()?;

        let hooks = remote_index_hooks(config)?;

        // `None` keeps the installed file sink
        let mut rotator: Option<FileRotator> = None;
        let sink: Option<Box<dyn Appender>> = match config.output {
            OutputTarget::Stdout => Some(Box::new(ConsoleAppender::stdout())),
            OutputTarget::Stderr => Some(Box::new(ConsoleAppender::stderr())),
            OutputTarget::File => {
                match self.inner.reusable_file(&config.output_file) {
                    Some(existing) => {
                        existing.set_mode(config.file_mode);
                        rotator = Some(existing);
                        None
                    }
                    None => {
                        let appender =
                            DailyFileAppender::with_mode(&config.output_file, config.file_mode)?;
                        rotator = Some(appender.rotator());
                        Some(Box::new(appender))
                    }
                }
            }
        };

        let rotation = match rotator {
            Some(ref rotator) => {
                Some(self.spawn_rotation(rotator.clone(), config.rotation_interval())?)
            }
            None => None,
        };

        if !hooks.is_empty() || !self.inner.hooks.is_empty() {
            self.inner
                .ensure_dispatcher(config.hook_queue_capacity, config.hook_timeout())?;
        }

        *self.inner.level.write() = config.level;
        *self.inner.format.write() = config.format;
        let generation = self.install_sink(sink, rotation, rotator);

        for hook in hooks {
            self.inner.hooks.register_if_absent(hook);
        }

        Ok(LoggerGuard {
            logger: self.clone(),
            generation,
            released: false,
        })
    }

    /// Install a sink configuration and return its generation
    ///
    /// With `sink == None` the current sink stays and only the rotation task
    /// is replaced.
    fn install_sink(
        &self,
        sink: Option<Box<dyn Appender>>,
        rotation: Option<RotationTask>,
        file: Option<FileRotator>,
    ) -> u64 {
        let mut generation = self.inner.generation.lock();
        self.inner.stop_rotation();
        if let Some(sink) = sink {
            self.inner.replace_sink(sink);
        }
        *self.inner.active_file.lock() = file;
        *self.inner.rotation.lock() = rotation;
        *generation += 1;
        *generation
    }

    fn spawn_rotation(&self, rotator: FileRotator, interval: Duration) -> Result<RotationTask> {
        let weak: Weak<LoggerInner> = Arc::downgrade(&self.inner);
        RotationTask::spawn(rotator, interval, move |result| {
            if let Some(inner) = weak.upgrade() {
                inner.on_rotation(result);
            }
        })
    }

    pub fn level(&self) -> LogLevel {
        *self.inner.level.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.inner.level.write() = level;
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.inner.is_enabled(level)
    }

    pub fn format(&self) -> OutputFormat {
        *self.inner.format.read()
    }

    pub fn set_format(&self, format: OutputFormat) {
        *self.inner.format.write() = format;
    }

    pub fn set_timestamp_format(&self, format: TimestampFormat) {
        *self.inner.timestamp_format.write() = format;
    }

    /// Attach `version` to every subsequent entry
    pub fn set_version(&self, version: impl Into<String>) {
        *self.inner.version.write() = Some(version.into());
    }

    pub fn version(&self) -> Option<String> {
        self.inner.version.read().clone()
    }

    /// Replace the sink; stops file rotation if it was running
    pub fn set_output(&self, sink: Box<dyn Appender>) {
        self.install_sink(Some(sink), None, None);
    }

    /// Write to `appender` and rotate it every `interval` (and at local
    /// midnight)
    ///
    /// # Errors
    ///
    /// Returns error if the rotation thread cannot be started; the current
    /// sink stays active in that case
    pub fn set_file_output(&self, appender: DailyFileAppender, interval: Duration) -> Result<()> {
        let rotator = appender.rotator();
        let rotation = self.spawn_rotation(rotator.clone(), interval)?;
        self.install_sink(Some(Box::new(appender)), Some(rotation), Some(rotator));
        Ok(())
    }

    /// Install `hook` even if one of the same kind exists
    ///
    /// # Errors
    ///
    /// Returns error if the hook worker cannot be started
    pub fn add_hook(&self, hook: Arc<dyn Hook>) -> Result<()> {
        self.inner.hooks.register(hook);
        self.inner
            .ensure_dispatcher(DEFAULT_HOOK_QUEUE_CAPACITY, DEFAULT_HOOK_TIMEOUT)
    }

    /// Install `hook` unless one of the same kind exists; returns whether it
    /// was installed
    pub fn register_hook(&self, hook: Arc<dyn Hook>) -> Result<bool> {
        let installed = self.inner.hooks.register_if_absent(hook);
        self.inner
            .ensure_dispatcher(DEFAULT_HOOK_QUEUE_CAPACITY, DEFAULT_HOOK_TIMEOUT)?;
        Ok(installed)
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.inner.hooks
    }

    /// Wait until queued hook deliveries finish; `false` on timeout
    pub fn drain_hooks(&self, timeout: Duration) -> bool {
        match *self.inner.dispatcher.read() {
            Some(ref dispatcher) => dispatcher.drain(timeout),
            None => true,
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.inner
            .rotation
            .lock()
            .as_ref()
            .is_some_and(RotationTask::is_running)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.metrics
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.flush_sink()
    }

    /// Entry builder carrying extra fields
    pub fn with_fields(&self, ctx: &TraceContext, fields: Fields) -> Entry<'_> {
        Entry {
            logger: self,
            ctx: ctx.clone(),
            fields,
        }
    }

    pub fn log(&self, ctx: &TraceContext, level: LogLevel, message: impl Into<String>) {
        self.inner.emit(ctx, level, message.into(), Fields::new());
    }

    /// Formatted variant of [`Logger::log`]; arguments are only rendered
    /// when `level` is enabled
    pub fn log_fmt(&self, ctx: &TraceContext, level: LogLevel, args: fmt::Arguments<'_>) {
        if self.inner.is_enabled(level) {
            self.inner.emit(ctx, level, args.to_string(), Fields::new());
        }
    }

    #[inline]
    pub fn trace(&self, ctx: &TraceContext, message: impl Into<String>) {
        self.log(ctx, LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, ctx: &TraceContext, message: impl Into<String>) {
        self.log(ctx, LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, ctx: &TraceContext, message: impl Into<String>) {
        self.log(ctx, LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, ctx: &TraceContext, message: impl Into<String>) {
        self.log(ctx, LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, ctx: &TraceContext, message: impl Into<String>) {
        self.log(ctx, LogLevel::Error, message);
    }

    #[inline]
    pub fn trace_fmt(&self, ctx: &TraceContext, args: fmt::Arguments<'_>) {
        self.log_fmt(ctx, LogLevel::Trace, args);
    }

    #[inline]
    pub fn debug_fmt(&self, ctx: &TraceContext, args: fmt::Arguments<'_>) {
        self.log_fmt(ctx, LogLevel::Debug, args);
    }

    #[inline]
    pub fn info_fmt(&self, ctx: &TraceContext, args: fmt::Arguments<'_>) {
        self.log_fmt(ctx, LogLevel::Info, args);
    }

    #[inline]
    pub fn warn_fmt(&self, ctx: &TraceContext, args: fmt::Arguments<'_>) {
        self.log_fmt(ctx, LogLevel::Warn, args);
    }

    #[inline]
    pub fn error_fmt(&self, ctx: &TraceContext, args: fmt::Arguments<'_>) {
        self.log_fmt(ctx, LogLevel::Error, args);
    }

    /// Log at fatal level, flush, wait for hooks and exit the process with
    /// status 1
    pub fn fatal(&self, ctx: &TraceContext, message: impl Into<String>) -> ! {
        self.fatal_with(ctx, message.into(), Fields::new())
    }

    pub fn fatal_fmt(&self, ctx: &TraceContext, args: fmt::Arguments<'_>) -> ! {
        self.fatal_with(ctx, args.to_string(), Fields::new())
    }

    /// Log at panic level, flush, wait for hooks, then panic with `message`
    ///
    /// Only the calling thread unwinds; the panic can be intercepted with
    /// [`std::panic::catch_unwind`].
    pub fn panic(&self, ctx: &TraceContext, message: impl Into<String>) -> ! {
        self.panic_with(ctx, message.into(), Fields::new())
    }

    pub fn panic_fmt(&self, ctx: &TraceContext, args: fmt::Arguments<'_>) -> ! {
        self.panic_with(ctx, args.to_string(), Fields::new())
    }

    fn fatal_with(&self, ctx: &TraceContext, message: String, fields: Fields) -> ! {
        self.inner.emit(ctx, LogLevel::Fatal, message, fields);
        self.inner.flush_for_exit();
        std::process::exit(1)
    }

    fn panic_with(&self, ctx: &TraceContext, message: String, fields: Fields) -> ! {
        self.inner.emit(ctx, LogLevel::Panic, message.clone(), fields);
        self.inner.flush_for_exit();
        panic!("{}", message)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("format", &self.format())
            .field("sink", &self.inner.sink.lock().name())
            .field("hooks", &self.inner.hooks.kinds())
            .finish()
    }
}

#[cfg(feature = "remote-index")]
fn remote_index_hooks(config: &LoggerConfig) -> Result<Vec<Arc<dyn Hook>>> {
    use crate::hooks::{ElasticsearchClient, ElasticsearchHook, MeilisearchClient, MeilisearchHook};

    let mut hooks: Vec<Arc<dyn Hook>> = Vec::new();

    if config.meilisearch.is_enabled() {
        let client = MeilisearchClient::new(
            &config.meilisearch.host,
            &config.meilisearch.api_key,
            config.hook_timeout(),
        )?;
        hooks.push(Arc::new(MeilisearchHook::new(
            Arc::new(client),
            config.index_name.clone(),
        )));
    }

    if config.elasticsearch.is_enabled() {
        let client = ElasticsearchClient::new(
            &config.elasticsearch.addresses,
            &config.elasticsearch.username,
            &config.elasticsearch.password,
            config.hook_timeout(),
        )?;
        hooks.push(Arc::new(ElasticsearchHook::new(
            Arc::new(client),
            config.index_name.clone(),
        )));
    }

    Ok(hooks)
}

#[cfg(not(feature = "remote-index"))]
fn remote_index_hooks(config: &LoggerConfig) -> Result<Vec<Arc<dyn Hook>>> {
    if config.has_remote_index() {
        return Err(super::error::LoggerError::config(
            "hooks",
            "remote indexers require the `remote-index` feature",
        ));
    }
    Ok(Vec::new())
}

/// Log entry under construction with caller-supplied fields
pub struct Entry<'a> {
    logger: &'a Logger,
    ctx: TraceContext,
    fields: Fields,
}

impl Entry<'_> {
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn log(self, level: LogLevel, message: impl Into<String>) {
        self.logger
            .inner
            .emit(&self.ctx, level, message.into(), self.fields);
    }

    pub fn log_fmt(self, level: LogLevel, args: fmt::Arguments<'_>) {
        if self.logger.is_enabled(level) {
            self.log(level, args.to_string());
        }
    }

    pub fn trace(self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn trace_fmt(self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Trace, args);
    }

    pub fn debug_fmt(self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Debug, args);
    }

    pub fn info_fmt(self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Info, args);
    }

    pub fn warn_fmt(self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Warn, args);
    }

    pub fn error_fmt(self, args: fmt::Arguments<'_>) {
        self.log_fmt(LogLevel::Error, args);
    }

    pub fn fatal(self, message: impl Into<String>) -> ! {
        self.logger.fatal_with(&self.ctx, message.into(), self.fields)
    }

    pub fn fatal_fmt(self, args: fmt::Arguments<'_>) -> ! {
        self.logger.fatal_with(&self.ctx, args.to_string(), self.fields)
    }

    pub fn panic(self, message: impl Into<String>) -> ! {
        self.logger.panic_with(&self.ctx, message.into(), self.fields)
    }

    pub fn panic_fmt(self, args: fmt::Arguments<'_>) -> ! {
        self.logger.panic_with(&self.ctx, args.to_string(), self.fields)
    }
}

/// Keeps a configuration in effect; tearing it down stops file rotation,
/// closes the log file (output falls back to stderr) and drains the hook
/// queue within [`DEFAULT_SHUTDOWN_TIMEOUT`].
///
/// Only the most recent configuration is torn down. A guard whose
/// configuration was replaced by a later `configure`, `set_output` or
/// `set_file_output` releases nothing.
#[must_use = "dropping the guard tears the logger configuration down immediately"]
#[derive(Debug)]
pub struct LoggerGuard {
    logger: Logger,
    generation: u64,
    released: bool,
}

impl LoggerGuard {
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Whether this guard's configuration is still the one in effect
    pub fn is_current(&self) -> bool {
        *self.logger.inner.generation.lock() == self.generation
    }

    /// Tear down explicitly and observe close errors
    pub fn teardown(mut self) -> Result<()> {
        self.released = true;
        self.logger.inner.teardown(self.generation)
    }
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.logger.inner.teardown(self.generation) {
            eprintln!("[LOGGER ERROR] Failed to close log sink during teardown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::{SharedBuffer, WriterAppender};
    use crate::hooks::HookKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn capture() -> (Logger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Logger::with_output(Box::new(WriterAppender::new(buffer.clone())));
        (logger, buffer)
    }

    fn parse(line: &str) -> serde_json::Value {
        serde_json::from_str(line).unwrap()
    }

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Hook for Counting {
        fn kind(&self) -> HookKind {
            HookKind::Custom("counting".to_string())
        }

        async fn fire(&self, _entry: &LogEntry) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_entries_carry_trace_id() {
        let (logger, buffer) = capture();
        let ctx = TraceContext::background();

        logger.info(&ctx, "first");
        logger.info(&ctx, "second");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        let first = parse(&lines[0]);
        let second = parse(&lines[1]);
        assert!(!first["trace_id"].as_str().unwrap().is_empty());
        // No id in the context: each entry gets a fresh one
        assert_ne!(first["trace_id"], second["trace_id"]);
    }

    #[test]
    fn test_existing_trace_id_is_reused() {
        let (logger, buffer) = capture();
        let ctx = TraceContext::background().with_trace_id("req-1");

        logger.warn(&ctx, "a");
        logger.error(&ctx, "b");

        for line in buffer.lines() {
            assert_eq!(parse(&line)["trace_id"], "req-1");
        }
    }

    #[test]
    fn test_version_and_span_fields() {
        let (logger, buffer) = capture();
        logger.set_version("1.4.2");
        let ctx = TraceContext::background().with_span("checkout", "create_order");

        logger.info(&ctx, "created");

        let line = parse(&buffer.lines()[0]);
        assert_eq!(line["version"], "1.4.2");
        assert_eq!(line["title"], "checkout");
        assert_eq!(line["function"], "create_order");
        assert_eq!(logger.version().as_deref(), Some("1.4.2"));
    }

    #[test]
    fn test_level_filtering() {
        let (logger, buffer) = capture();
        let ctx = TraceContext::background();

        logger.debug(&ctx, "hidden");
        logger.set_level(LogLevel::Debug);
        logger.debug(&ctx, "shown");
        logger.trace(&ctx, "hidden too");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(parse(&lines[0])["message"], "shown");
        assert!(logger.is_enabled(LogLevel::Fatal));
    }

    #[test]
    fn test_fmt_variants_and_fields() {
        let (logger, buffer) = capture();
        let ctx = TraceContext::background();

        logger.info_fmt(&ctx, format_args!("user {} logged in", 42));
        logger
            .with_fields(&ctx, Fields::new().with_field("order_id", 7))
            .with_field("message", "shadowed")
            .warn_fmt(format_args!("order {} delayed", 7));

        let lines = buffer.lines();
        assert_eq!(parse(&lines[0])["message"], "user 42 logged in");

        let second = parse(&lines[1]);
        assert_eq!(second["level"], "warning");
        assert_eq!(second["message"], "order 7 delayed");
        assert_eq!(second["order_id"], 7);
        assert_eq!(second["fields.message"], "shadowed");
    }

    #[test]
    fn test_text_format() {
        let (logger, buffer) = capture();
        logger.set_format(OutputFormat::Text);
        logger.info(&TraceContext::background().with_trace_id("t-1"), "plain");

        let line = &buffer.lines()[0];
        assert!(line.contains("level=info"));
        assert!(line.contains("message=\"plain\""));
        assert!(line.contains("trace_id=t-1"));
    }

    #[test]
    fn test_panic_is_catchable_and_logged() {
        let (logger, buffer) = capture();
        let ctx = TraceContext::background();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.panic(&ctx, "unrecoverable state");
        }));

        let payload = result.unwrap_err();
        assert_eq!(
            payload.downcast_ref::<String>().map(String::as_str),
            Some("unrecoverable state")
        );
        let line = parse(&buffer.lines()[0]);
        assert_eq!(line["level"], "panic");
        assert_eq!(line["message"], "unrecoverable state");
    }

    #[test]
    fn test_hooks_receive_entries() {
        let (logger, _buffer) = capture();
        let hook = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        assert!(logger.register_hook(hook.clone()).unwrap());
        assert!(!logger.register_hook(hook.clone()).unwrap());

        let ctx = TraceContext::background();
        for _ in 0..10 {
            logger.info(&ctx, "x");
        }
        assert!(logger.drain_hooks(Duration::from_secs(5)));

        assert_eq!(hook.calls.load(Ordering::SeqCst), 10);
        assert_eq!(logger.metrics().hook_entries_queued(), 10);
    }

    #[test]
    fn test_add_hook_does_not_deduplicate() {
        let (logger, _buffer) = capture();
        let hook = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        logger.add_hook(hook.clone()).unwrap();
        logger.add_hook(hook.clone()).unwrap();
        assert_eq!(logger.hooks().len(), 2);

        logger.info(&TraceContext::background(), "twice");
        assert!(logger.drain_hooks(Duration::from_secs(5)));
        assert_eq!(hook.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_configure_rejects_bad_indexer_without_side_effects() {
        let (logger, buffer) = capture();
        let config = LoggerConfig::new()
            .with_level(LogLevel::Error)
            .with_index_name("logs")
            .with_elasticsearch(["not a url"], "", "");

        assert!(logger.configure(&config).is_err());

        // Previous level and sink remain active
        assert_eq!(logger.level(), LogLevel::Info);
        logger.info(&TraceContext::background(), "still here");
        assert_eq!(buffer.lines().len(), 1);
        assert!(logger.hooks().is_empty());
    }

    #[test]
    fn test_teardown_falls_back_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new();
        let guard = logger
            .configure(&LoggerConfig::new().with_output_file(dir.path().join("app.log")))
            .unwrap();
        assert!(logger.is_rotating());

        guard.teardown().unwrap();
        assert!(!logger.is_rotating());
        assert!(format!("{:?}", logger).contains("stderr"));
    }

    fn read_today(base: &std::path::Path) -> String {
        let path = crate::appenders::dated_log_path(base, chrono::Local::now().date_naive());
        std::fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn test_replaced_guard_leaves_newer_configuration_running() {
        let dir = tempfile::tempdir().unwrap();
        let base_a = dir.path().join("a.log");
        let base_b = dir.path().join("b.log");
        let logger = Logger::new();

        let guard_a = logger
            .configure(&LoggerConfig::new().with_output_file(&base_a))
            .unwrap();
        let guard_b = logger
            .configure(&LoggerConfig::new().with_output_file(&base_b))
            .unwrap();
        assert!(!guard_a.is_current());
        assert!(guard_b.is_current());

        drop(guard_a);
        assert!(logger.is_rotating());

        logger.info(&TraceContext::background(), "lands in b");
        logger.flush().unwrap();
        assert_eq!(read_today(&base_b).lines().count(), 1);
        assert_eq!(read_today(&base_a).lines().count(), 0);

        guard_b.teardown().unwrap();
        assert!(!logger.is_rotating());
    }

    #[test]
    fn test_set_output_supersedes_configured_guard() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new();
        let guard = logger
            .configure(&LoggerConfig::new().with_output_file(dir.path().join("app.log")))
            .unwrap();

        let buffer = SharedBuffer::new();
        logger.set_output(Box::new(WriterAppender::new(buffer.clone())));
        drop(guard);

        logger.info(&TraceContext::background(), "kept");
        assert_eq!(buffer.lines().len(), 1);
    }

    #[test]
    fn test_reconfiguring_same_file_keeps_single_handle() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        let logger = Logger::new();
        let ctx = TraceContext::background();

        let first = logger
            .configure(&LoggerConfig::new().with_output_file(&base))
            .unwrap();
        let rotator = logger.inner.active_file.lock().clone().unwrap();
        logger.info(&ctx, "before");

        // Same dated file under the suffix-less spelling of the base path
        let second = logger
            .configure(
                &LoggerConfig::new()
                    .with_output_file(dir.path().join("app"))
                    .with_level(LogLevel::Debug),
            )
            .unwrap();

        // The open appender was kept rather than reopened
        assert!(rotator.is_open());
        let reused = logger.inner.active_file.lock().clone().unwrap();
        assert!(rotator.same_sink(&reused));

        drop(first);
        logger.debug(&ctx, "after");
        second.teardown().unwrap();
        assert!(!rotator.is_open());

        let content = read_today(&base);
        let messages: Vec<String> = content
            .lines()
            .map(|l| parse(l)["message"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(messages, vec!["before", "after"]);
    }

    #[test]
    fn test_changed_file_mode_applies_to_later_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        let logger = Logger::new();

        let _first = logger
            .configure(&LoggerConfig::new().with_output_file(&base))
            .unwrap();
        let rotator = logger.inner.active_file.lock().clone().unwrap();

        let _second = logger
            .configure(&LoggerConfig::new().with_output_file(&base).with_file_mode(0o600))
            .unwrap();

        assert!(rotator.is_open());
        assert_eq!(rotator.mode(), 0o600);
    }

    #[test]
    fn test_new_file_path_replaces_appender() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new();

        let _first = logger
            .configure(&LoggerConfig::new().with_output_file(dir.path().join("a.log")))
            .unwrap();
        let previous = logger.inner.active_file.lock().clone().unwrap();

        let _second = logger
            .configure(&LoggerConfig::new().with_output_file(dir.path().join("b.log")))
            .unwrap();

        assert!(!previous.is_open());
        let current = logger.inner.active_file.lock().clone().unwrap();
        assert!(!previous.same_sink(&current));
        assert!(current.is_open());
    }
}
