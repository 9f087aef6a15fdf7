//! Background rotation task for [`DailyFileAppender`](super::DailyFileAppender)

use super::rotating_file::{FileRotator, RotationOutcome};
use crate::core::error::{LoggerError, Result};
use chrono::{DateTime, Local, TimeZone};
use crossbeam_channel::{after, bounded, select, Sender};
use std::thread;
use std::time::Duration;

/// Default interval between rotation checks
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Time to wait before the next rotation attempt: the configured interval,
/// cut short at the next local midnight so a new day gets its file promptly.
pub fn next_rotation_delay<Tz: TimeZone>(now: &DateTime<Tz>, interval: Duration) -> Duration {
    let until_midnight = now
        .date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(now.timezone()).earliest())
        .and_then(|midnight| midnight.signed_duration_since(now).to_std().ok());

    match until_midnight {
        Some(delay) if delay < interval => delay,
        _ => interval,
    }
}

/// Periodic rotation thread
///
/// Stopped by [`RotationTask::stop`] or on drop.
pub struct RotationTask {
    shutdown: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RotationTask {
    /// Spawn the rotation thread
    ///
    /// `on_tick` receives the outcome of every attempt. A failed rotation
    /// leaves the previous file active and is retried on the next tick.
    pub fn spawn<F>(rotator: FileRotator, interval: Duration, on_tick: F) -> Result<Self>
    where
        F: Fn(Result<RotationOutcome>) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("log-rotation".to_string())
            .spawn(move || loop {
                let wait = next_rotation_delay(&Local::now(), interval);
                select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(after(wait)) -> _ => on_tick(rotator.rotate()),
                }
            })
            .map_err(|e| {
                LoggerError::io_operation("spawning rotation thread", "thread spawn failed", e)
            })?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        // Disconnecting the channel wakes the select
        drop(self.shutdown.take());

        if let Some(handle) = self.handle.take() {
            // The task may be dropped from its own tick callback
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if let Err(e) = handle.join() {
                eprintln!("[LOGGER ERROR] Rotation thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for RotationTask {
    fn drop(&mut self) {
        self.stop_inner();
    }
}
