//! The sink capability shared by every log destination

use std::io::Write;
use std::sync::Arc;

use crate::error::Result;

/// Anything that accepts formatted log lines
///
/// Implementations must be safe to call from many threads at once and must
/// never interleave two concurrent lines.
pub trait LineSink: Send + Sync {
    /// Append one formatted line, returning the number of bytes written
    fn write_line(&self, line: &[u8]) -> Result<usize>;
}

impl<S: LineSink + ?Sized> LineSink for Arc<S> {
    fn write_line(&self, line: &[u8]) -> Result<usize> {
        (**self).write_line(line)
    }
}

impl<S: LineSink + ?Sized> LineSink for Box<S> {
    fn write_line(&self, line: &[u8]) -> Result<usize> {
        (**self).write_line(line)
    }
}

/// Duplicates every line to stdout after handing it to the inner sink
///
/// Stdout failures are ignored; the inner sink's result is returned.
pub struct ConsoleMirror<S> {
    inner: S,
}

impl<S: LineSink> ConsoleMirror<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: LineSink> LineSink for ConsoleMirror<S> {
    fn write_line(&self, line: &[u8]) -> Result<usize> {
        let result = self.inner.write_line(line);

        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(line);
        let _ = stdout.flush();

        result
    }
}
