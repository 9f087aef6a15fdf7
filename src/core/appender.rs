//! Appender trait for log output destinations

use super::error::Result;

/// A sink receiving fully formatted log lines.
///
/// `append` is called with one formatted entry (no trailing newline) while
/// the logger holds the sink lock, so an implementation sees writes one at
/// a time.
pub trait Appender: Send {
    fn append(&mut self, line: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;

    /// Release the underlying resource. Defaults to a flush.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}
