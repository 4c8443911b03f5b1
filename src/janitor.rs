//! Removes stale per-request scratch directories.
//!
//! Scratch directories are normally deleted as soon as their publish's CPU
//! stage ends. A crash or kill leaves them behind, so the server sweeps the
//! scratch root at start-up and then every [`SWEEP_INTERVAL`].
//!
//! A sweep applies three caps in order: entries older than the age limit go
//! first, then the oldest entries until at most `max_entries` remain, then the
//! oldest entries until their combined size fits `max_bytes`. Entries touched
//! within `in_use_grace` are never removed by the count or size caps since a
//! running publish may still own them.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fontpress_config::ConvertConfig;

use crate::publish::SCRATCH_PREFIX;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Minimum idle time before the count and size caps may remove an entry.
pub const IN_USE_GRACE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepLimits {
    pub max_age: Duration,
    pub max_entries: usize,
    pub max_bytes: u64,
    pub in_use_grace: Duration,
}

impl SweepLimits {
    pub fn from_config(convert: &ConvertConfig) -> Self {
        Self {
            max_age: convert.scratch_max_age(),
            max_entries: convert.scratch_max_entries,
            max_bytes: convert.scratch_max_bytes(),
            in_use_grace: IN_USE_GRACE,
        }
    }
}

/// Entries removed by each cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub excess: usize,
    pub oversize: usize,
    pub freed_bytes: u64,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.expired + self.excess + self.oversize
    }
}

struct ScratchEntry {
    path: PathBuf,
    age: Duration,
    size: u64,
}

/// Sweep `root`. Entries not created by the publisher are left alone and do
/// not count toward the caps.
pub fn sweep(root: &Path, limits: &SweepLimits) -> std::io::Result<SweepReport> {
    let mut report = SweepReport::default();
    if !root.is_dir() {
        return Ok(report);
    }

    let mut entries = scratch_entries(root)?;
    // Oldest first.
    entries.sort_by(|a, b| b.age.cmp(&a.age));

    let mut kept = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.age >= limits.max_age && remove(&entry, "stale") {
            report.expired += 1;
            report.freed_bytes += entry.size;
        } else {
            kept.push(entry);
        }
    }

    let mut count = kept.len();
    let mut total: u64 = kept.iter().map(|e| e.size).sum();
    for entry in &kept {
        if count <= limits.max_entries && total <= limits.max_bytes {
            break;
        }
        if entry.age < limits.in_use_grace {
            // Everything after this is younger.
            break;
        }
        let over_count = count > limits.max_entries;
        if !remove(entry, if over_count { "excess" } else { "oversize" }) {
            continue;
        }
        if over_count {
            report.excess += 1;
        } else {
            report.oversize += 1;
        }
        report.freed_bytes += entry.size;
        count -= 1;
        total -= entry.size;
    }

    if total > limits.max_bytes {
        log::warn!(
            "Scratch root {} holds {} bytes of recent entries, above the {} byte cap",
            root.display(),
            total,
            limits.max_bytes
        );
    }
    Ok(report)
}

fn scratch_entries(root: &Path) -> std::io::Result<Vec<ScratchEntry>> {
    let now = SystemTime::now();
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with(SCRATCH_PREFIX) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or(Duration::ZERO);
        let path = entry.path();
        let size = if metadata.is_dir() {
            tree_size(&path)
        } else {
            metadata.len()
        };
        entries.push(ScratchEntry { path, age, size });
    }
    Ok(entries)
}

/// Total file bytes under `dir`. Unreadable parts count as zero.
fn tree_size(dir: &Path) -> u64 {
    let Ok(read) = std::fs::read_dir(dir) else {
        return 0;
    };
    read.filter_map(Result::ok)
        .map(|entry| match entry.metadata() {
            Ok(m) if m.is_dir() => tree_size(&entry.path()),
            Ok(m) => m.len(),
            Err(_) => 0,
        })
        .sum()
}

fn remove(entry: &ScratchEntry, reason: &str) -> bool {
    let result = if entry.path.is_dir() {
        std::fs::remove_dir_all(&entry.path)
    } else {
        std::fs::remove_file(&entry.path)
    };
    match result {
        Ok(()) => {
            log::info!("Removed {} scratch entry {}", reason, entry.path.display());
            true
        }
        Err(e) => {
            log::warn!(
                "Failed to remove {} scratch entry {}: {}",
                reason,
                entry.path.display(),
                e
            );
            false
        }
    }
}

/// Sweep now and then periodically until the runtime shuts down.
pub fn spawn(root: PathBuf, limits: SweepLimits) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let root = root.clone();
            match tokio::task::spawn_blocking(move || sweep(&root, &limits)).await {
                Ok(Ok(report)) if report.total() > 0 => {
                    log::info!(
                        "Scratch sweep removed {} entries ({} stale, {} excess, {} oversize), freed {:.1} MB",
                        report.total(),
                        report.expired,
                        report.excess,
                        report.oversize,
                        report.freed_bytes as f64 / (1024.0 * 1024.0)
                    );
                }
                Ok(Ok(_)) => log::debug!("Scratch sweep found nothing to remove"),
                Ok(Err(e)) => log::warn!("Scratch sweep failed: {}", e),
                Err(e) => log::warn!("Scratch sweep task failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn limits() -> SweepLimits {
        SweepLimits {
            max_age: 24 * HOUR,
            max_entries: 1000,
            max_bytes: 500 * 1024 * 1024,
            in_use_grace: Duration::ZERO,
        }
    }

    /// A scratch file of `size` bytes last modified `age` ago.
    fn scratch_file(root: &Path, name: &str, size: usize, age: Duration) -> PathBuf {
        let path = root.join(format!("{SCRATCH_PREFIX}{name}"));
        std::fs::write(&path, vec![0u8; size]).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[test]
    fn test_sweep_removes_only_stale_scratch_entries() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join(format!("{SCRATCH_PREFIX}old"));
        std::fs::create_dir(&stale).unwrap();
        std::fs::write(stale.join("transformed.ttf"), b"x").unwrap();
        let foreign = root.path().join("keep-me");
        std::fs::create_dir(&foreign).unwrap();

        // Everything counts as stale with a zero max age.
        let report = sweep(
            root.path(),
            &SweepLimits {
                max_age: Duration::ZERO,
                ..limits()
            },
        )
        .unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.freed_bytes, 1);
        assert!(!stale.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn test_sweep_keeps_fresh_entries() {
        let root = tempfile::tempdir().unwrap();
        let fresh = root.path().join(format!("{SCRATCH_PREFIX}new"));
        std::fs::create_dir(&fresh).unwrap();
        assert_eq!(sweep(root.path(), &limits()).unwrap().total(), 0);
        assert!(fresh.exists());
    }

    #[test]
    fn test_count_cap_removes_oldest_first() {
        let root = tempfile::tempdir().unwrap();
        let oldest = scratch_file(root.path(), "a", 1, 3 * HOUR);
        let middle = scratch_file(root.path(), "b", 1, 2 * HOUR);
        let newest = scratch_file(root.path(), "c", 1, HOUR);

        let report = sweep(
            root.path(),
            &SweepLimits {
                max_entries: 1,
                ..limits()
            },
        )
        .unwrap();
        assert_eq!(report.excess, 2);
        assert_eq!(report.expired, 0);
        assert!(!oldest.exists());
        assert!(!middle.exists());
        assert!(newest.exists());
    }

    #[test]
    fn test_size_cap_frees_until_under_limit() {
        let root = tempfile::tempdir().unwrap();
        let oldest = scratch_file(root.path(), "a", 400, 3 * HOUR);
        let middle = scratch_file(root.path(), "b", 400, 2 * HOUR);
        let newest = scratch_file(root.path(), "c", 400, HOUR);

        let report = sweep(
            root.path(),
            &SweepLimits {
                max_bytes: 900,
                ..limits()
            },
        )
        .unwrap();
        assert_eq!(report.oversize, 1);
        assert_eq!(report.freed_bytes, 400);
        assert!(!oldest.exists());
        assert!(middle.exists());
        assert!(newest.exists());
    }

    #[test]
    fn test_caps_spare_entries_in_use() {
        let root = tempfile::tempdir().unwrap();
        let idle = scratch_file(root.path(), "idle", 10, 2 * HOUR);
        let busy = scratch_file(root.path(), "busy", 10, Duration::from_secs(5));

        let report = sweep(
            root.path(),
            &SweepLimits {
                max_entries: 0,
                max_bytes: 0,
                in_use_grace: IN_USE_GRACE,
                ..limits()
            },
        )
        .unwrap();
        assert_eq!(report.excess, 1);
        assert!(!idle.exists());
        assert!(busy.exists());
    }

    #[test]
    fn test_sweep_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let report = sweep(&root.path().join("absent"), &limits()).unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_limits_from_config_defaults() {
        let limits = SweepLimits::from_config(&ConvertConfig::default());
        assert_eq!(limits.max_age, 24 * HOUR);
        assert_eq!(limits.max_entries, 1000);
        assert_eq!(limits.max_bytes, 500 * 1024 * 1024);
        assert_eq!(limits.in_use_grace, IN_USE_GRACE);
    }
}
