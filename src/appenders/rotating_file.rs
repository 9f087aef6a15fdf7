//! Date-stamped file appender with rotation
//!
//! The active file is named `<base>.<YYYY-MM-DD>.log`, where `<base>` is the
//! configured path with any `.log` suffix removed. The file handle lives in a
//! state block shared between the appender (used by writers through the
//! logger's sink lock) and any [`FileRotator`] clones (used by the rotation
//! task). Every write and every rotation takes the same lock, so a line is
//! written entirely to one file and no writer ever sees a closed handle.

use crate::core::appender::Appender;
use crate::core::error::{LoggerError, Result};
use chrono::{DateTime, Local, NaiveDate};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Permission bits for newly created log files (owner rw, group r)
pub const DEFAULT_FILE_MODE: u32 = 0o640;

/// Compute the dated file name for `base` on `date`
///
/// ```
/// use trace_logger::appenders::dated_log_path;
/// use chrono::NaiveDate;
/// use std::path::Path;
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
/// assert_eq!(
///     dated_log_path(Path::new("/var/log/app.log"), date),
///     Path::new("/var/log/app.2025-01-08.log")
/// );
/// ```
pub fn dated_log_path(base: &Path, date: NaiveDate) -> PathBuf {
    let base = base.to_string_lossy();
    let stem = base.strip_suffix(".log").unwrap_or(&base);
    PathBuf::from(format!("{}.{}.log", stem, date.format("%Y-%m-%d")))
}

/// Lifecycle of the file sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSinkPhase {
    Unopened,
    Open,
    Rotating,
    Closed,
}

/// Result of a rotation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Today's file was already active; it was flushed and kept
    Unchanged(PathBuf),
    /// The previous file was closed and a new dated file opened
    Rotated { from: PathBuf, to: PathBuf },
}

fn open_log_file(path: &Path, mode: u32) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}

struct FileState {
    base_path: PathBuf,
    current_path: PathBuf,
    writer: Option<LineWriter<File>>,
    last_rotation: DateTime<Local>,
    mode: u32,
    phase: FileSinkPhase,
}

impl FileState {
    fn open(&mut self, date: NaiveDate) -> Result<()> {
        let path = dated_log_path(&self.base_path, date);
        let file = open_log_file(&path, self.mode).map_err(|e| {
            LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
        })?;

        self.writer = Some(LineWriter::new(file));
        self.current_path = path;
        self.last_rotation = Local::now();
        self.phase = FileSinkPhase::Open;
        Ok(())
    }

    fn rotate_to(&mut self, date: NaiveDate) -> Result<RotationOutcome> {
        if self.phase == FileSinkPhase::Closed {
            return Err(LoggerError::file_rotation(
                self.base_path.display().to_string(),
                "file sink is closed",
            ));
        }

        let target = dated_log_path(&self.base_path, date);
        if target == self.current_path && self.writer.is_some() {
            self.flush()?;
            return Ok(RotationOutcome::Unchanged(target));
        }

        self.phase = FileSinkPhase::Rotating;

        // Close the current handle before the next one is opened
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                self.writer = Some(writer);
                self.phase = FileSinkPhase::Open;
                return Err(LoggerError::file_rotation(
                    self.current_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                ));
            }
        }

        match open_log_file(&target, self.mode) {
            Ok(file) => {
                let from = std::mem::replace(&mut self.current_path, target.clone());
                self.writer = Some(LineWriter::new(file));
                self.last_rotation = Local::now();
                self.phase = FileSinkPhase::Open;
                Ok(RotationOutcome::Rotated { from, to: target })
            }
            Err(e) => {
                let err = LoggerError::file_rotation(
                    target.display().to_string(),
                    format!("Failed to create new log file: {}", e),
                );

                // Keep writing to the previous file until the next attempt
                match open_log_file(&self.current_path, self.mode) {
                    Ok(file) => self.writer = Some(LineWriter::new(file)),
                    Err(reopen_err) => eprintln!(
                        "[LOGGER ERROR] Failed to reopen '{}' after rotation failure: {}",
                        self.current_path.display(),
                        reopen_err
                    ),
                }
                self.phase = FileSinkPhase::Open;
                Err(err)
            }
        }
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            LoggerError::file_sink(
                self.current_path.display().to_string(),
                "log file is not open",
            )
        })?;

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        writer.write_all(&buf).map_err(|e| {
            LoggerError::file_sink(
                self.current_path.display().to_string(),
                format!("Failed to write log entry: {}", e),
            )
        })
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.current_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let result = self.flush();
        self.writer = None;
        self.phase = FileSinkPhase::Closed;
        result
    }
}

/// File appender writing to today's dated log file
///
/// # Examples
///
/// ```no_run
/// use trace_logger::appenders::DailyFileAppender;
///
/// // Writes to /var/log/app.<today>.log
/// let appender = DailyFileAppender::new("/var/log/app.log").unwrap();
/// let rotator = appender.rotator();
/// rotator.rotate().unwrap();
/// ```
pub struct DailyFileAppender {
    shared: Arc<Mutex<FileState>>,
}

impl DailyFileAppender {
    /// Open today's file for `base`, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory or the file cannot be created
    pub fn new<P: AsRef<Path>>(base: P) -> Result<Self> {
        Self::with_mode(base, DEFAULT_FILE_MODE)
    }

    /// Like [`DailyFileAppender::new`] with explicit permission bits for
    /// created files
    pub fn with_mode<P: AsRef<Path>>(base: P, mode: u32) -> Result<Self> {
        Self::open_on(base, mode, Local::now().date_naive())
    }

    /// Open the dated file for `date` instead of today
    pub fn open_on<P: AsRef<Path>>(base: P, mode: u32, date: NaiveDate) -> Result<Self> {
        let base_path = base.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "create log directory",
                        format!("Failed to create directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let mut state = FileState {
            current_path: base_path.clone(),
            base_path,
            writer: None,
            last_rotation: Local::now(),
            mode,
            phase: FileSinkPhase::Unopened,
        };
        state.open(date)?;

        Ok(Self {
            shared: Arc::new(Mutex::new(state)),
        })
    }

    /// Handle used by the rotation task to swap the active file
    #[must_use]
    pub fn rotator(&self) -> FileRotator {
        FileRotator {
            shared: Arc::clone(&self.shared),
        }
    }

    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.shared.lock().current_path.clone()
    }

    #[must_use]
    pub fn base_path(&self) -> PathBuf {
        self.shared.lock().base_path.clone()
    }

    #[must_use]
    pub fn phase(&self) -> FileSinkPhase {
        self.shared.lock().phase
    }
}

impl Appender for DailyFileAppender {
    fn name(&self) -> &str {
        "file"
    }

    fn append(&mut self, line: &str) -> Result<()> {
        self.shared.lock().write_line(line)
    }

    fn flush(&mut self) -> Result<()> {
        self.shared.lock().flush()
    }

    fn close(&mut self) -> Result<()> {
        self.shared.lock().close()
    }
}

impl Drop for DailyFileAppender {
    fn drop(&mut self) {
        // Best effort flush - ignore errors during drop
        let _ = self.shared.lock().flush();
    }
}

/// Clonable handle that rotates a [`DailyFileAppender`]'s file
#[derive(Clone)]
pub struct FileRotator {
    shared: Arc<Mutex<FileState>>,
}

impl FileRotator {
    /// Rotate to today's dated file
    ///
    /// Calling this again on the same day keeps the current file.
    ///
    /// # Errors
    ///
    /// Returns error if the old file cannot be flushed or the new one cannot
    /// be opened. In both cases writers keep using the previous file.
    pub fn rotate(&self) -> Result<RotationOutcome> {
        self.rotate_to(Local::now().date_naive())
    }

    /// Rotate to the dated file for `date`
    pub fn rotate_to(&self, date: NaiveDate) -> Result<RotationOutcome> {
        self.shared.lock().rotate_to(date)
    }

    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.shared.lock().current_path.clone()
    }

    #[must_use]
    pub fn last_rotation(&self) -> DateTime<Local> {
        self.shared.lock().last_rotation
    }

    #[must_use]
    pub fn base_path(&self) -> PathBuf {
        self.shared.lock().base_path.clone()
    }

    #[must_use]
    pub fn mode(&self) -> u32 {
        self.shared.lock().mode
    }

    /// Permission bits for files opened by later rotations
    pub fn set_mode(&self, mode: u32) {
        self.shared.lock().mode = mode;
    }

    /// Whether both handles drive the same appender
    #[must_use]
    pub fn same_sink(&self, other: &FileRotator) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Whether the sink still holds a file handle
    #[must_use]
    pub fn is_open(&self) -> bool {
        let state = self.shared.lock();
        state.phase != FileSinkPhase::Closed && state.writer.is_some()
    }
}
