//! tracing integration
//!
//! Lets the rest of the process keep using `tracing` macros while records land
//! in the rotating app/error files. The `message` field becomes the message,
//! a `prefix` field becomes the prefix tag, everything else is an attribute.

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use super::facade::Logger;
use super::record::{Attribute, Level, LogRecord};

/// Environment variable holding the tracing filter directive
pub const FILTER_ENV: &str = "SVCLOG_LOG";

/// Forwards tracing events to a `Logger`
pub struct FacadeLayer {
    logger: Logger,
}

impl FacadeLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl<S: Subscriber> Layer<S> for FacadeLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::new(Level::from(*event.metadata().level()), visitor.message);
        record.prefix = visitor.prefix;
        record.attributes = visitor.attributes;
        self.logger.record(record);
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    prefix: Option<String>,
    attributes: Vec<Attribute>,
}

impl RecordVisitor {
    fn put(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = value,
            "prefix" => self.prefix = Some(value),
            _ => self.attributes.push(Attribute { key: name.to_string(), value }),
        }
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field.name(), format!("{:?}", value));
    }
}

/// Install a global tracing subscriber that feeds `logger`
///
/// Uses `SVCLOG_LOG` as the filter (default `info`). Returns false if a
/// global subscriber was already set.
pub fn install_tracing(logger: Logger) -> bool {
    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(FacadeLayer::new(logger))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::buffer::LineBuffer;
    use crate::logging::handler::DualSinkHandler;
    use std::sync::Arc;

    fn capture<F: FnOnce()>(f: F) -> (Vec<String>, Vec<String>) {
        let app = Arc::new(LineBuffer::new(100));
        let errors = Arc::new(LineBuffer::new(100));
        let logger = Logger::from_handler(Arc::new(DualSinkHandler::new(app.clone(), errors.clone())));

        let subscriber = tracing_subscriber::registry().with(FacadeLayer::new(logger));
        tracing::subscriber::with_default(subscriber, f);

        (app.lines(), errors.lines())
    }

    #[test]
    fn test_event_fields_become_record() {
        let (app, errors) = capture(|| {
            tracing::info!(prefix = "HTTP", status = 200, path = "/health", "GET done");
        });

        assert_eq!(app.len(), 1);
        assert!(errors.is_empty());
        assert!(app[0].contains("[INFO] [HTTP] GET done status=200 path=/health\r\n"));
    }

    #[test]
    fn test_trace_maps_to_debug_and_error_is_mirrored() {
        let (app, errors) = capture(|| {
            tracing::trace!("fine grained");
            tracing::error!(code = 3, "broke: {}", "disk");
        });

        assert!(app[0].contains("[DEBUG] fine grained"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("[ERROR] broke: disk code=3"));
    }

    #[test]
    fn test_display_values_unquoted_unless_spaced() {
        let (app, _) = capture(|| {
            let reason = "timed out";
            tracing::warn!(reason = %reason, attempt = 2, "retrying");
        });

        assert!(app[0].ends_with("retrying reason=\"timed out\" attempt=2\r\n"));
    }
}
