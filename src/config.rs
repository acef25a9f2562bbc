//! Configuration for the service and its logging

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};
use crate::logging::{Level, SinkConfig};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default config file name, looked up next to the executable
pub const CONFIG_FILE: &str = "config.json";

/// TOML alternative, used when no `config.json` is present
pub const TOML_CONFIG_FILE: &str = "config.toml";

/// Logging policy
///
/// Paths are relative to the execution base directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Directory for log files (default: "logs")
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// File name of the main log (default: "app.log")
    #[serde(default = "default_app_file")]
    pub app_file: String,

    /// File name of the error-only log (default: "error.log")
    #[serde(default = "default_error_file")]
    pub error_file: String,

    /// Rotate once a file would reach this many megabytes (default: 20)
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,

    /// Rotated files kept per log (default: 1024)
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Rotated files older than this are deleted, 0 keeps them forever (default: 512)
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,

    /// Records at or above this level are also written to the error log
    #[serde(default = "default_error_threshold")]
    pub error_threshold: Level,

    /// Mirror the main log to stdout (default: true)
    #[serde(default = "default_console")]
    pub console: bool,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_app_file() -> String {
    "app.log".to_string()
}

fn default_error_file() -> String {
    "error.log".to_string()
}

fn default_max_size_mb() -> u64 {
    20
}

fn default_max_backups() -> usize {
    1024
}

fn default_max_age_days() -> u64 {
    512
}

fn default_error_threshold() -> Level {
    Level::Error
}

fn default_console() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            app_file: default_app_file(),
            error_file: default_error_file(),
            max_size_mb: default_max_size_mb(),
            max_backups: default_max_backups(),
            max_age_days: default_max_age_days(),
            error_threshold: default_error_threshold(),
            console: default_console(),
        }
    }
}

impl LoggingConfig {
    /// Sink policy for `file` inside the log directory under `base_dir`
    pub fn sink_config(&self, base_dir: &Path, file: &str) -> SinkConfig {
        SinkConfig::new(base_dir.join(&self.dir).join(file))
            .with_max_size_bytes(self.max_size_mb.saturating_mul(BYTES_PER_MB))
            .with_max_backups(self.max_backups)
            .with_max_age_days(self.max_age_days)
    }
}

/// Name and description of the installed service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceIdentity {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub description: String,
}

fn default_name() -> String {
    "svclog".to_string()
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: default_name(),
            display_name: String::new(),
            description: String::new(),
        }
    }
}

/// Service identity and listener settings
///
/// Same shape as the service's `config.json`:
/// `{"service": {"name": ..., "display_name": ..., "description": ...}, "listen_port": "8080"}`
/// with an optional `logging` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Port the HTTP listener binds (default: "8080")
    #[serde(default = "default_listen_port")]
    pub listen_port: String,

    #[serde(default)]
    pub service: ServiceIdentity,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_listen_port() -> String {
    "8080".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            service: ServiceIdentity::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from a `.toml` or `.json` file, or return defaults if it is missing
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_err = |message: String| LogError::Config {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| config_err(e.to_string())),
            _ => toml::from_str(&content).map_err(|e| config_err(e.to_string())),
        }
    }

    /// Load `config.json` from `dir`, falling back to `config.toml`, then defaults
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let json = dir.join(CONFIG_FILE);
        if json.exists() {
            return Self::load(&json);
        }
        Self::load(&dir.join(TOML_CONFIG_FILE))
    }

    /// Parsed listener port
    pub fn port(&self) -> Result<u16> {
        self.listen_port
            .trim()
            .parse()
            .map_err(|_| LogError::InvalidPort(self.listen_port.clone()))
    }
}

/// Directory of the running executable, with symlinks resolved
pub fn execution_base_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(LogError::BaseDir)?;
    let exe = std::fs::canonicalize(&exe).map_err(LogError::BaseDir)?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        LogError::BaseDir(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "executable has no parent directory",
        ))
    })
}
