//! Error types for the logging pipeline

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("cannot create log directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open log file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot rotate {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot append to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("invalid listen_port '{0}'")]
    InvalidPort(String),

    #[error("cannot resolve executable directory: {0}")]
    BaseDir(#[source] std::io::Error),
}

impl LogError {
    /// Short label of the error kind, used on the stderr side channel
    pub fn kind(&self) -> &'static str {
        match self {
            LogError::DirectoryCreate { .. } => "DirectoryCreateError",
            LogError::FileOpen { .. } => "FileOpenError",
            LogError::Rename { .. } => "RenameError",
            LogError::Write { .. } => "WriteError",
            LogError::Config { .. } | LogError::InvalidPort(_) => "ConfigError",
            LogError::BaseDir(_) => "BaseDirError",
        }
    }
}

pub type Result<T> = std::result::Result<T, LogError>;
