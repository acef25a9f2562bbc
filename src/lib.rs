//! svclog - rotating dual-sink line logging for small web services
//!
//! Formats records as single text lines, writes them to a size-rotated app log
//! mirrored to stdout, duplicates error-level records into a separate error
//! log, and prunes rotated backups by age and count.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;

pub use error::{LogError, Result};
