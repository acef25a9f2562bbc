//! Line formatting
//!
//! Renders a record as
//! `[2026-01-21T14:30:45.123] [INFO] [HTTP] message key=value key2="spaced value"\r\n`.

use std::fmt::Write;

use super::record::LogRecord;

/// Timestamp layout: local ISO-8601 with milliseconds
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Attribute key that doubles as the prefix tag when the record has none
const PREFIX_KEY: &str = "prefix";

/// Format a record as a single CRLF-terminated line
pub fn format_line(record: &LogRecord) -> String {
    let mut line = String::with_capacity(64 + record.message.len());

    let _ = write!(
        line,
        "[{}] [{}]",
        record.timestamp.format(TIMESTAMP_FORMAT),
        record.level.as_str()
    );

    let prefix = record.prefix.as_deref().or_else(|| {
        record
            .attributes
            .iter()
            .rev()
            .find(|a| a.key == PREFIX_KEY)
            .map(|a| a.value.as_str())
    });
    if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
        line.push_str(" [");
        line.push_str(prefix);
        line.push(']');
    }

    line.push(' ');
    line.push_str(&record.message);

    for attr in record.attributes.iter().filter(|a| a.key != PREFIX_KEY) {
        line.push(' ');
        line.push_str(&attr.key);
        line.push('=');
        if attr.value.contains(char::is_whitespace) {
            line.push('"');
            line.push_str(&attr.value);
            line.push('"');
        } else {
            line.push_str(&attr.value);
        }
    }

    line.push_str("\r\n");
    line
}
