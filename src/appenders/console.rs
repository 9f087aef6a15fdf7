//! Console appender implementation

use crate::core::{Appender, Result};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

pub struct ConsoleAppender {
    stream: ConsoleStream,
}

impl ConsoleAppender {
    pub fn new(stream: ConsoleStream) -> Self {
        Self { stream }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleStream::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleStream::Stderr)
    }

    pub fn stream(&self) -> ConsoleStream {
        self.stream
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::stderr()
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, line: &str) -> Result<()> {
        // Lock the stream for the whole line so concurrent println! output
        // from elsewhere in the process cannot interleave with it.
        match self.stream {
            ConsoleStream::Stdout => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", line)?;
            }
            ConsoleStream::Stderr => {
                let mut err = std::io::stderr().lock();
                writeln!(err, "{}", line)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.stream {
            ConsoleStream::Stdout => std::io::stdout().flush()?,
            ConsoleStream::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        match self.stream {
            ConsoleStream::Stdout => "stdout",
            ConsoleStream::Stderr => "stderr",
        }
    }
}
