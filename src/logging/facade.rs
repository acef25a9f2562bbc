//! Process-wide logging entry point
//!
//! `init` builds the app and error sinks under `<base>/logs/`, wires them into
//! a `DualSinkHandler` and installs it once. `Logger` handles route records to
//! either an explicit handler or whatever handler is installed.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use crate::config::LoggingConfig;
use crate::error::Result;

use super::file_writer::RotatingFileSink;
use super::format::format_line;
use super::handler::DualSinkHandler;
use super::record::{Attribute, Level, LogRecord};
use super::sink::{ConsoleMirror, LineSink};

/// Serializes `init_with` so only one handler is ever built and installed
static INIT_LOCK: Mutex<()> = Mutex::new(());

static INSTALLED: OnceLock<Logger> = OnceLock::new();

#[derive(Clone)]
enum Route {
    /// Resolve the installed logger at call time
    Installed,
    Handler(Arc<DualSinkHandler>),
}

/// Cheap, cloneable logging handle with an optional prefix tag
#[derive(Clone)]
pub struct Logger {
    route: Route,
    prefix: Option<Arc<str>>,
}

impl Logger {
    /// Logger writing through an explicit handler (not installed globally)
    pub fn from_handler(handler: Arc<DualSinkHandler>) -> Self {
        Self {
            route: Route::Handler(handler),
            prefix: None,
        }
    }

    /// Logger that always goes through the installed handler, falling back to
    /// stderr before `init` has run
    pub fn installed() -> Self {
        Self {
            route: Route::Installed,
            prefix: None,
        }
    }

    /// Open the app and error sinks described by `config` under `base_dir`
    pub fn open(base_dir: &Path, config: &LoggingConfig) -> Result<Self> {
        let app = RotatingFileSink::open(config.sink_config(base_dir, &config.app_file))?;
        let errors = RotatingFileSink::open(config.sink_config(base_dir, &config.error_file))?;

        let primary: Arc<dyn LineSink> = if config.console {
            Arc::new(ConsoleMirror::new(app))
        } else {
            Arc::new(app)
        };
        let handler = DualSinkHandler::with_threshold(primary, Arc::new(errors), config.error_threshold);

        Ok(Self::from_handler(Arc::new(handler)))
    }

    /// The handler behind this logger, if it is bound to one
    pub fn handler(&self) -> Option<&Arc<DualSinkHandler>> {
        match &self.route {
            Route::Handler(handler) => Some(handler),
            Route::Installed => INSTALLED.get().and_then(|l| l.handler()),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Copy of this logger that tags every record with `tag`
    pub fn with_prefix(&self, tag: impl Into<String>) -> Self {
        Self {
            route: self.route.clone(),
            prefix: Some(Arc::from(tag.into())),
        }
    }

    pub fn log(&self, level: Level, message: impl Into<String>, attrs: &[(&str, &dyn fmt::Display)]) {
        let mut record = LogRecord::new(level, message);
        record.attributes = attrs
            .iter()
            .map(|(key, value)| Attribute::new(*key, value))
            .collect();
        self.record(record);
    }

    /// Route a pre-built record, filling in this logger's prefix if unset
    pub fn record(&self, mut record: LogRecord) {
        if record.prefix.is_none() {
            record.prefix = self.prefix.as_deref().map(str::to_string);
        }
        match &self.route {
            Route::Handler(handler) => handler.handle(&record),
            Route::Installed => match INSTALLED.get() {
                Some(logger) => logger.record(record),
                None => write_bootstrap(&record),
            },
        }
    }

    pub fn debug(&self, message: impl Into<String>, attrs: &[(&str, &dyn fmt::Display)]) {
        self.log(Level::Debug, message, attrs);
    }

    pub fn info(&self, message: impl Into<String>, attrs: &[(&str, &dyn fmt::Display)]) {
        self.log(Level::Info, message, attrs);
    }

    pub fn warn(&self, message: impl Into<String>, attrs: &[(&str, &dyn fmt::Display)]) {
        self.log(Level::Warn, message, attrs);
    }

    pub fn error(&self, message: impl Into<String>, attrs: &[(&str, &dyn fmt::Display)]) {
        self.log(Level::Error, message, attrs);
    }

    /// Log at `Fatal`. Does not terminate the process.
    pub fn fatal(&self, message: impl Into<String>, attrs: &[(&str, &dyn fmt::Display)]) {
        self.log(Level::Fatal, message, attrs);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let route = match self.route {
            Route::Installed => "installed",
            Route::Handler(_) => "handler",
        };
        f.debug_struct("Logger")
            .field("route", &route)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Pre-init records go to stderr in the normal line format
fn write_bootstrap(record: &LogRecord) {
    eprint!("{}", format_line(record));
}

/// Install the default logging setup under `base_dir`
pub fn init(base_dir: impl AsRef<Path>) -> Result<&'static Logger> {
    init_with(base_dir, &LoggingConfig::default())
}

/// Install logging under `base_dir` with an explicit policy
///
/// The first successful call wins; later calls return the installed logger
/// without opening any files. A failed call installs nothing.
pub fn init_with(base_dir: impl AsRef<Path>, config: &LoggingConfig) -> Result<&'static Logger> {
    let _guard = match INIT_LOCK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(logger) = INSTALLED.get() {
        return Ok(logger);
    }

    let logger = Logger::open(base_dir.as_ref(), config)?;
    Ok(INSTALLED.get_or_init(|| logger))
}

/// The installed logger, if `init` has succeeded
pub fn global() -> Option<&'static Logger> {
    INSTALLED.get()
}

/// Log through the installed logger (stderr before `init`)
///
/// `prefix` tags this one record; `None` leaves it untagged.
pub fn log(
    level: Level,
    message: impl Into<String>,
    prefix: Option<&str>,
    attrs: &[(&str, &dyn fmt::Display)],
) {
    let logger = match prefix {
        Some(tag) => Logger::installed().with_prefix(tag),
        None => Logger::installed(),
    };
    logger.log(level, message, attrs);
}

/// Tagged logger over the installed handler
pub fn with_prefix(tag: impl Into<String>) -> Logger {
    Logger::installed().with_prefix(tag)
}
