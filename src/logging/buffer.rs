//! In-memory line buffer
//!
//! A thread-safe ring buffer of formatted lines. Useful as a log tail inside
//! the process and as a deterministic sink in tests.

use std::collections::VecDeque;
use std::sync::RwLock;

use crate::error::Result;

use super::sink::LineSink;

/// Bounded ring of formatted log lines
pub struct LineBuffer {
    /// Stored lines (capped at max_lines)
    lines: RwLock<VecDeque<String>>,
    /// Maximum lines to keep
    max_lines: usize,
}

impl LineBuffer {
    /// Create a buffer that keeps at most `max_lines` lines
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: RwLock::new(VecDeque::with_capacity(max_lines.min(1024))),
            max_lines,
        }
    }

    /// Push a line, evicting the oldest one at capacity
    pub fn push(&self, line: String) {
        if self.max_lines == 0 {
            return;
        }
        let mut lines = match self.lines.write() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        if lines.len() >= self.max_lines {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Get all lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .read()
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lines.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether any stored line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .read()
            .map(|l| l.iter().any(|line| line.contains(needle)))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.write() {
            lines.clear();
        }
    }
}

impl LineSink for LineBuffer {
    fn write_line(&self, line: &[u8]) -> Result<usize> {
        self.push(String::from_utf8_lossy(line).into_owned());
        Ok(line.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_push_and_retrieve() {
        let buffer = LineBuffer::new(100);

        buffer.push("line 1".to_string());
        buffer.push("line 2".to_string());

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.lines(), vec!["line 1", "line 2"]);
        assert!(buffer.contains("2"));
        assert!(!buffer.contains("3"));
    }

    #[test]
    fn test_line_buffer_capacity() {
        let buffer = LineBuffer::new(3);

        for i in 0..5 {
            buffer.push(format!("msg {}", i));
        }

        assert_eq!(buffer.lines(), vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_line_buffer_as_sink() {
        let buffer = LineBuffer::new(10);
        let written = buffer.write_line(b"[INFO] ok\r\n").unwrap();

        assert_eq!(written, 11);
        assert_eq!(buffer.lines(), vec!["[INFO] ok\r\n"]);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let buffer = LineBuffer::new(0);
        buffer.push("dropped".to_string());
        assert!(buffer.is_empty());
    }
}
