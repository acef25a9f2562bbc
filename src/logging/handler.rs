//! Dual-sink routing
//!
//! Every record goes to the primary sink. Records at or above the threshold
//! (Error by default) are also written to the secondary sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::format::format_line;
use super::record::{Level, LogRecord};
use super::sink::LineSink;

/// Writes each record to a primary sink and mirrors severe ones to a
/// secondary sink
pub struct DualSinkHandler {
    primary: Arc<dyn LineSink>,
    secondary: Arc<dyn LineSink>,
    threshold: Level,
    /// Sink writes that failed and were dropped
    failures: AtomicU64,
}

impl DualSinkHandler {
    /// Create a handler that mirrors `Error` and `Fatal` to the secondary sink
    pub fn new(primary: Arc<dyn LineSink>, secondary: Arc<dyn LineSink>) -> Self {
        Self::with_threshold(primary, secondary, Level::Error)
    }

    pub fn with_threshold(
        primary: Arc<dyn LineSink>,
        secondary: Arc<dyn LineSink>,
        threshold: Level,
    ) -> Self {
        Self {
            primary,
            secondary,
            threshold,
            failures: AtomicU64::new(0),
        }
    }

    pub fn threshold(&self) -> Level {
        self.threshold
    }

    /// Number of sink writes that failed since the handler was built
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Format and route one record. Never fails; sink errors are reported on
    /// stderr and counted.
    pub fn handle(&self, record: &LogRecord) {
        let line = format_line(record);
        let bytes = line.as_bytes();

        self.write_to(&*self.primary, "primary", bytes);
        if record.level >= self.threshold {
            self.write_to(&*self.secondary, "secondary", bytes);
        }
    }

    fn write_to(&self, sink: &dyn LineSink, name: &str, bytes: &[u8]) {
        if let Err(e) = sink.write_line(bytes) {
            let count = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
            // Not routed through tracing: that would re-enter this handler
            eprintln!("svclog: {} sink write failed ({}): {} [failures={}]", name, e.kind(), e, count);
        }
    }
}
