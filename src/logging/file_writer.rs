//! Size-rotated log file
//!
//! A `RotatingFileSink` owns one log file. When a write would push the file
//! to `max_size_bytes`, the file is renamed to `<path>.<YYYY-MM-DD-HHMMSS>`,
//! a fresh file is opened at `<path>`, and a retention sweep is started in
//! the background.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::error::{LogError, Result};

use super::retention;
use super::sink::LineSink;

/// Suffix layout for rotated backups, second resolution in local time
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Paths currently owned by a live sink in this process
static OPEN_PATHS: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Rotation and retention policy for one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Active log file path
    pub path: PathBuf,
    /// Rotate before a write that would make the file reach this size
    pub max_size_bytes: u64,
    /// Backups kept after a sweep
    pub max_backups: usize,
    /// Backups older than this are deleted; 0 disables the age check
    pub max_age_days: u64,
}

impl SinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: 20 * 1024 * 1024,
            max_backups: 1024,
            max_age_days: 512,
        }
    }

    #[must_use]
    pub fn with_max_size_bytes(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use]
    pub fn with_max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }

    /// Directory holding the log file and its backups
    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Backup path for a rotation happening at `at`
pub fn backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(at.format(BACKUP_TIMESTAMP_FORMAT).to_string());
    PathBuf::from(name)
}

/// Like `backup_path`, but adds `.1`, `.2`, ... when a rotation already
/// happened within the same second
fn unused_backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let base = backup_path(path, at);
    if !base.exists() {
        return base;
    }
    let mut n: u32 = 1;
    loop {
        let mut name = base.as_os_str().to_owned();
        name.push(format!(".{}", n));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogError::FileOpen {
            path: path.to_path_buf(),
            source,
        })
}

/// Open file handle and its size as seen by this process
struct SinkState {
    file: File,
    current_size: u64,
}

/// Decrements the in-flight sweep counter when the sweep finishes or is
/// never started
struct SweepGuard(Arc<AtomicUsize>);

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A log file that rotates by size and prunes its backups
pub struct RotatingFileSink {
    config: Arc<SinkConfig>,
    /// Key in OPEN_PATHS
    owned_path: PathBuf,
    state: Mutex<SinkState>,
    pending_sweeps: Arc<AtomicUsize>,
}

impl RotatingFileSink {
    /// Create the log directory, open the file for appending and start an
    /// initial retention sweep
    pub fn open(config: SinkConfig) -> Result<Self> {
        let dir = config.dir().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| LogError::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;

        let owned_path = match (fs::canonicalize(&dir), config.path.file_name()) {
            (Ok(dir), Some(name)) => dir.join(name),
            _ => config.path.clone(),
        };
        claim_path(&owned_path).map_err(|source| LogError::FileOpen {
            path: config.path.clone(),
            source,
        })?;

        let opened = open_append(&config.path).and_then(|file| {
            let current_size = file
                .metadata()
                .map_err(|source| LogError::FileOpen {
                    path: config.path.clone(),
                    source,
                })?
                .len();
            Ok(SinkState { file, current_size })
        });
        let state = match opened {
            Ok(state) => state,
            Err(e) => {
                release_path(&owned_path);
                return Err(e);
            }
        };

        let sink = Self {
            config: Arc::new(config),
            owned_path,
            state: Mutex::new(state),
            pending_sweeps: Arc::new(AtomicUsize::new(0)),
        };
        sink.spawn_sweep();
        Ok(sink)
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Bytes in the active file as written through this sink
    pub fn current_size(&self) -> u64 {
        self.lock_state().current_size
    }

    /// Number of retention sweeps started but not yet finished
    pub fn pending_sweeps(&self) -> usize {
        self.pending_sweeps.load(Ordering::SeqCst)
    }

    /// Poll until every started sweep has finished or `timeout` elapses.
    /// Returns true when no sweep is left running.
    pub fn wait_for_sweeps(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending_sweeps() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }

    /// Flush the active file handle
    pub fn flush(&self) -> Result<()> {
        let mut state = self.lock_state();
        state.file.flush().map_err(|source| LogError::Write {
            path: self.config.path.clone(),
            source,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, SinkState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Rename the active file to a timestamped backup and swap in a fresh
    /// handle. The old handle stays in place until the new one is open.
    fn rotate(&self, state: &mut SinkState) -> Result<()> {
        let path = &self.config.path;
        let backup = unused_backup_path(path, Local::now());

        let _ = state.file.flush();
        fs::rename(path, &backup).map_err(|source| LogError::Rename {
            from: path.clone(),
            to: backup.clone(),
            source,
        })?;

        let file = match open_append(path) {
            Ok(file) => file,
            Err(e) => {
                // Put the old name back so the retained handle and the path agree again
                let _ = fs::rename(&backup, path);
                return Err(e);
            }
        };

        state.file = file;
        state.current_size = 0;
        Ok(())
    }

    /// Run a retention sweep off the calling thread
    fn spawn_sweep(&self) {
        self.pending_sweeps.fetch_add(1, Ordering::SeqCst);
        let guard = SweepGuard(Arc::clone(&self.pending_sweeps));
        let config = Arc::clone(&self.config);

        let job = move || {
            let _guard = guard;
            let report = retention::sweep(&config);
            if report.removed() > 0 || report.failed > 0 {
                tracing::debug!(
                    path = %config.path.display(),
                    expired = report.expired,
                    trimmed = report.trimmed,
                    failed = report.failed,
                    "Retention sweep finished"
                );
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                // On spawn failure the closure (and its guard) is dropped
                let _ = std::thread::Builder::new()
                    .name("svclog-sweep".into())
                    .spawn(job);
            }
        }
    }
}

impl LineSink for RotatingFileSink {
    fn write_line(&self, buf: &[u8]) -> Result<usize> {
        let incoming = buf.len() as u64;
        let mut rotated = false;

        let written = {
            let mut state = self.lock_state();

            if state.current_size + incoming >= self.config.max_size_bytes {
                self.rotate(&mut state)?;
                rotated = true;
            }

            match state.file.write_all(buf) {
                Ok(()) => {
                    state.current_size += incoming;
                    Ok(buf.len())
                }
                Err(source) => {
                    // A partial append may have landed; resync from the file
                    if let Ok(meta) = state.file.metadata() {
                        state.current_size = meta.len();
                    }
                    Err(LogError::Write {
                        path: self.config.path.clone(),
                        source,
                    })
                }
            }
        };

        if rotated {
            self.spawn_sweep();
        }
        written
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        release_path(&self.owned_path);
    }
}

fn claim_path(path: &Path) -> std::io::Result<()> {
    let mut open = match OPEN_PATHS.lock() {
        Ok(open) => open,
        Err(poisoned) => poisoned.into_inner(),
    };
    if open.iter().any(|p| p == path) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "log file is already owned by another sink",
        ));
    }
    open.push(path.to_path_buf());
    Ok(())
}

fn release_path(path: &Path) {
    let mut open = match OPEN_PATHS.lock() {
        Ok(open) => open,
        Err(poisoned) => poisoned.into_inner(),
    };
    open.retain(|p| p != path);
}
