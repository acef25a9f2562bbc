//! Logging before `init` must never panic, and loggers created early must
//! start writing to the files once `init` has run.
//!
//! Kept in its own test binary: the installed logger is process-wide, so this
//! is the only place that can observe the uninitialized state.

use std::fs;

use svclog::config::LoggingConfig;
use svclog::logging::{self, Level, Logger};
use tempfile::TempDir;

#[test]
fn test_logging_before_and_after_init() {
    assert!(logging::global().is_none());

    // Bootstrap path: stderr only, nothing installed
    let early = logging::with_prefix("BOOT");
    early.info("starting", &[("step", &1)]);
    early.fatal("before init", &[]);
    logging::log(Level::Error, "no sinks yet", None, &[]);
    logging::log(Level::Warn, "tagged", Some("CFG"), &[("key", &"listen_port")]);
    Logger::installed().debug("still bootstrapping", &[]);

    assert!(logging::global().is_none());
    assert!(early.handler().is_none());
    assert!(Logger::installed().handler().is_none());

    let temp_dir = TempDir::new().unwrap();
    let config = LoggingConfig {
        console: false,
        ..LoggingConfig::default()
    };
    logging::init_with(temp_dir.path(), &config).unwrap();

    assert!(logging::global().is_some());
    assert!(early.handler().is_some());

    early.error("after init", &[]);
    logging::log(Level::Info, "plain", None, &[]);

    let app = fs::read_to_string(temp_dir.path().join("logs/app.log")).unwrap();
    let errors = fs::read_to_string(temp_dir.path().join("logs/error.log")).unwrap();

    // Bootstrap records were not replayed into the files
    assert!(!app.contains("before init"));
    assert!(!errors.contains("no sinks yet"));

    assert!(app.contains("[ERROR] [BOOT] after init"));
    assert!(app.contains("[INFO] plain"));
    assert_eq!(errors.lines().count(), 1);
    assert!(errors.contains("[ERROR] [BOOT] after init"));
}
