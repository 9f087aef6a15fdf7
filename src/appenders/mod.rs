//! Sink implementations

pub mod console;
pub mod rotating_file;
pub mod rotation;
pub mod writer;

pub use console::{ConsoleAppender, ConsoleStream};
pub use rotating_file::{
    dated_log_path, DailyFileAppender, FileRotator, FileSinkPhase, RotationOutcome,
    DEFAULT_FILE_MODE,
};
pub use rotation::{next_rotation_delay, RotationTask, DEFAULT_ROTATION_INTERVAL};
pub use writer::{SharedBuffer, WriterAppender};

pub use crate::core::Appender;
