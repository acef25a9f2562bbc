//! Backup retention
//!
//! Deletes rotated backups of a sink that are older than `max_age_days`,
//! then trims the oldest survivors down to `max_backups`. Sweeps may overlap,
//! so a file that vanished before we could delete it counts as deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::file_writer::SinkConfig;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// A rotated backup as found on disk
#[derive(Debug, Clone)]
pub struct BackupFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Deleted for exceeding the age limit
    pub expired: usize,
    /// Deleted for exceeding the backup count
    pub trimmed: usize,
    /// Deletions that failed and were skipped
    pub failed: usize,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired + self.trimmed
    }
}

fn backup_prefix(config: &SinkConfig) -> Option<String> {
    config
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|name| format!("{}.", name))
}

/// Creation order of a backup named `<basename>.<stamp>[.<n>]`
///
/// Same-second collisions get a numeric suffix, so `.10` must sort after
/// `.2`; a bare stamp sorts before any of its suffixed siblings.
fn rotation_key<'a>(prefix: &str, path: &'a Path) -> (&'a str, u32) {
    let rest = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|name| name.strip_prefix(prefix))
        .unwrap_or_default();
    match rest.split_once('.') {
        Some((stamp, n)) => match n.parse() {
            Ok(n) => (stamp, n),
            Err(_) => (rest, 0),
        },
        None => (rest, 0),
    }
}

/// List every `<basename>.*` file next to the sink's log file
pub fn list_backups(config: &SinkConfig) -> io::Result<Vec<BackupFile>> {
    let Some(prefix) = backup_prefix(config) else {
        return Ok(Vec::new());
    };

    let mut backups = Vec::new();
    for entry in fs::read_dir(config.dir())? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };

        let is_backup = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with(&prefix))
            .unwrap_or(false);
        if !is_backup {
            continue;
        }

        // Files removed by a concurrent sweep simply drop out here
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        backups.push(BackupFile {
            path: entry.path(),
            modified,
        });
    }

    Ok(backups)
}

/// Apply the age and count policy to the sink's backups
///
/// Never fails: listing and deletion errors are logged and skipped.
pub fn sweep(config: &SinkConfig) -> SweepReport {
    sweep_at(config, SystemTime::now())
}

fn sweep_at(config: &SinkConfig, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();

    let backups = match list_backups(config) {
        Ok(backups) => backups,
        Err(e) => {
            tracing::warn!(dir = %config.dir().display(), error = %e, "Cannot list log backups");
            return report;
        }
    };

    let mut survivors = Vec::with_capacity(backups.len());
    if config.max_age_days > 0 {
        let max_age = Duration::from_secs(config.max_age_days.saturating_mul(SECS_PER_DAY));
        for backup in backups {
            let age = now.duration_since(backup.modified).unwrap_or(Duration::ZERO);
            if age > max_age {
                if remove_backup(&backup.path) {
                    report.expired += 1;
                } else {
                    report.failed += 1;
                }
            } else {
                survivors.push(backup);
            }
        }
    } else {
        survivors = backups;
    }

    if survivors.len() > config.max_backups {
        // Backups rotated within the filesystem's mtime granularity tie on
        // `modified`; fall back to the order the sink created them in
        let prefix = backup_prefix(config).unwrap_or_default();
        survivors.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| rotation_key(&prefix, &a.path).cmp(&rotation_key(&prefix, &b.path)))
        });
        let excess = survivors.len() - config.max_backups;
        for backup in &survivors[..excess] {
            if remove_backup(&backup.path) {
                report.trimmed += 1;
            } else {
                report.failed += 1;
            }
        }
    }

    report
}

/// Delete one backup; "not found" counts as success
fn remove_backup(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete log backup");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn config_in(temp_dir: &TempDir, max_backups: usize, max_age_days: u64) -> SinkConfig {
        SinkConfig::new(temp_dir.path().join("app.log"))
            .with_max_backups(max_backups)
            .with_max_age_days(max_age_days)
    }

    fn backup_aged(temp_dir: &TempDir, suffix: &str, age_days: u64) -> PathBuf {
        let path = temp_dir.path().join(format!("app.log.{}", suffix));
        let file = File::create(&path).unwrap();
        let modified = SystemTime::now() - Duration::from_secs(age_days * SECS_PER_DAY + 60);
        file.set_modified(modified).unwrap();
        path
    }

    #[test]
    fn test_sweep_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        let report = sweep(&config_in(&temp_dir, 2, 7));
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_sweep_missing_dir_is_not_an_error() {
        let config = SinkConfig::new("/nonexistent/path/for/testing/app.log");
        assert_eq!(sweep(&config), SweepReport::default());
    }

    #[test]
    fn test_list_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();

        File::create(temp_dir.path().join("app.log")).unwrap();
        File::create(temp_dir.path().join("error.log.2026-01-01-000000")).unwrap();
        File::create(temp_dir.path().join("other.txt"))
            .unwrap()
            .write_all(b"test")
            .unwrap();
        fs::create_dir(temp_dir.path().join("app.log.d")).unwrap();
        let backup = backup_aged(&temp_dir, "2026-01-01-000000", 0);

        let backups = list_backups(&config_in(&temp_dir, 2, 0)).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].path, backup);
    }

    #[test]
    fn test_sweep_deletes_expired() {
        let temp_dir = TempDir::new().unwrap();
        let old = backup_aged(&temp_dir, "2025-01-01-000000", 10);
        let recent = backup_aged(&temp_dir, "2026-01-20-000000", 1);

        let report = sweep(&config_in(&temp_dir, 1024, 7));

        assert_eq!(report.expired, 1);
        assert_eq!(report.trimmed, 0);
        assert!(!old.exists());
        assert!(recent.exists());
    }

    #[test]
    fn test_sweep_age_zero_disables_age_check() {
        let temp_dir = TempDir::new().unwrap();
        let ancient = backup_aged(&temp_dir, "2020-01-01-000000", 2000);

        let report = sweep(&config_in(&temp_dir, 1024, 0));

        assert_eq!(report.removed(), 0);
        assert!(ancient.exists());
    }

    #[test]
    fn test_sweep_trims_oldest_first() {
        let temp_dir = TempDir::new().unwrap();
        let oldest = backup_aged(&temp_dir, "a", 5);
        let older = backup_aged(&temp_dir, "b", 4);
        let newer = backup_aged(&temp_dir, "c", 3);
        let newest = backup_aged(&temp_dir, "d", 2);

        let report = sweep(&config_in(&temp_dir, 2, 0));

        assert_eq!(report.trimmed, 2);
        assert!(!oldest.exists());
        assert!(!older.exists());
        assert!(newer.exists());
        assert!(newest.exists());
    }

    #[test]
    fn test_sweep_same_mtime_trims_in_rotation_order() {
        let temp_dir = TempDir::new().unwrap();
        let modified = SystemTime::now() - Duration::from_secs(60);
        let stamp = "2026-03-01-120000";
        let named = |suffix: &str| {
            let path = temp_dir.path().join(format!("app.log.{}{}", stamp, suffix));
            File::create(&path).unwrap().set_modified(modified).unwrap();
            path
        };
        let first = named("");
        let second = named(".1");
        let third = named(".2");
        let last = named(".10");

        let report = sweep(&config_in(&temp_dir, 2, 0));

        assert_eq!(report.trimmed, 2);
        assert!(!first.exists());
        assert!(!second.exists());
        assert!(third.exists());
        assert!(last.exists());
    }

    #[test]
    fn test_rotation_key_orders_collision_suffixes() {
        let key = |name: &str| rotation_key("app.log.", Path::new(name)).1;
        assert_eq!(key("app.log.2026-03-01-120000"), 0);
        assert_eq!(key("app.log.2026-03-01-120000.10"), 10);

        let mut names = vec![
            "app.log.2026-03-01-120000.10",
            "app.log.2026-03-01-120001",
            "app.log.2026-03-01-120000.2",
            "app.log.2026-03-01-120000",
        ];
        names.sort_by(|a, b| {
            rotation_key("app.log.", Path::new(a)).cmp(&rotation_key("app.log.", Path::new(b)))
        });
        assert_eq!(
            names,
            vec![
                "app.log.2026-03-01-120000",
                "app.log.2026-03-01-120000.2",
                "app.log.2026-03-01-120000.10",
                "app.log.2026-03-01-120001",
            ]
        );
    }

    #[test]
    fn test_sweep_count_applies_after_age() {
        let temp_dir = TempDir::new().unwrap();
        backup_aged(&temp_dir, "a", 40);
        backup_aged(&temp_dir, "b", 35);
        let kept1 = backup_aged(&temp_dir, "c", 3);
        let kept2 = backup_aged(&temp_dir, "d", 2);
        let kept3 = backup_aged(&temp_dir, "e", 1);

        let config = config_in(&temp_dir, 3, 30);
        let report = sweep(&config);

        assert_eq!(report.expired, 2);
        assert_eq!(report.trimmed, 0);
        let survivors = list_backups(&config).unwrap();
        assert_eq!(survivors.len(), 3);
        assert!(kept1.exists() && kept2.exists() && kept3.exists());
    }

    #[test]
    fn test_sweep_result_is_min_of_limits() {
        let temp_dir = TempDir::new().unwrap();
        for (i, age) in [50u64, 20, 15, 10, 5, 1].iter().enumerate() {
            backup_aged(&temp_dir, &format!("{}", i), *age);
        }

        let config = config_in(&temp_dir, 2, 30);
        sweep(&config);

        let survivors = list_backups(&config).unwrap();
        assert_eq!(survivors.len(), 2);
        let now = SystemTime::now();
        for backup in survivors {
            let age = now.duration_since(backup.modified).unwrap();
            assert!(age <= Duration::from_secs(30 * SECS_PER_DAY));
            assert!(age < Duration::from_secs(6 * SECS_PER_DAY));
        }
    }

    #[test]
    fn test_sweep_zero_backups_keeps_none() {
        let temp_dir = TempDir::new().unwrap();
        backup_aged(&temp_dir, "a", 1);
        backup_aged(&temp_dir, "b", 0);

        let config = config_in(&temp_dir, 0, 0);
        assert_eq!(sweep(&config).trimmed, 2);
        assert!(list_backups(&config).unwrap().is_empty());
    }

    #[test]
    fn test_remove_missing_backup_counts_as_deleted() {
        let temp_dir = TempDir::new().unwrap();
        assert!(remove_backup(&temp_dir.path().join("app.log.gone")));
    }

    #[test]
    fn test_sweep_at_future_time_expires_everything() {
        let temp_dir = TempDir::new().unwrap();
        backup_aged(&temp_dir, "a", 0);
        backup_aged(&temp_dir, "b", 0);

        let config = config_in(&temp_dir, 1024, 1);
        let later = SystemTime::now() + Duration::from_secs(3 * SECS_PER_DAY);
        let report = sweep_at(&config, later);

        assert_eq!(report.expired, 2);
        assert!(list_backups(&config).unwrap().is_empty());
    }
}
