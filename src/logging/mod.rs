//! Logging pipeline
//!
//! Records are formatted into single lines and routed to a size-rotated app
//! log (mirrored to stdout) and, for errors, a second rotated error log.
//! Rotated backups are pruned by age and count in the background.

mod buffer;
mod facade;
mod file_writer;
mod format;
mod handler;
mod layer;
mod record;
mod retention;
mod sink;

pub use buffer::LineBuffer;
pub use facade::{global, init, init_with, log, with_prefix, Logger};
pub use file_writer::{backup_path, RotatingFileSink, SinkConfig, BACKUP_TIMESTAMP_FORMAT};
pub use format::{format_line, TIMESTAMP_FORMAT};
pub use handler::DualSinkHandler;
pub use layer::{install_tracing, FacadeLayer, FILTER_ENV};
pub use record::{Attribute, Level, LogRecord};
pub use retention::{list_backups, sweep, BackupFile, SweepReport};
pub use sink::{ConsoleMirror, LineSink};
