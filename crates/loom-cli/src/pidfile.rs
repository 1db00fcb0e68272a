//! Advisory marker for a running `loom serve`.
//!
//! Several servers may share one store (SQLite WAL handles that), so the
//! pidfile never blocks startup. It only tells other processes, and the
//! operator, which server last claimed the data directory.

use std::path::{Path, PathBuf};

pub const PIDFILE: &str = "loom-serve.pid";

/// Our claim on `<data_dir>/loom-serve.pid`, removed on drop if still ours.
#[derive(Debug)]
pub struct ServePidfile {
    path: PathBuf,
    pid: u32,
}

impl ServePidfile {
    /// Write our PID into `dir`, reporting any server already recorded there.
    /// Returns `None` when the file cannot be written; serving continues.
    pub fn claim(dir: &Path) -> Option<Self> {
        Self::claim_as(dir, std::process::id())
    }

    fn claim_as(dir: &Path, pid: u32) -> Option<Self> {
        let path = dir.join(PIDFILE);
        match read_pid(&path) {
            Some(previous) if previous != pid && process_running(previous) => {
                tracing::warn!(pid = previous, "another loom serve is using this data directory");
            }
            Some(previous) => tracing::debug!(pid = previous, "replacing stale pidfile"),
            None => {}
        }

        if let Err(e) = std::fs::write(&path, pid.to_string()) {
            tracing::warn!("failed to write {}: {e}", path.display());
            return None;
        }
        tracing::debug!(pid, "claimed {}", path.display());
        Some(Self { path, pid })
    }
}

impl Drop for ServePidfile {
    fn drop(&mut self) {
        // A later server may have taken the file over.
        if read_pid(&self.path) != Some(self.pid) {
            tracing::debug!("pidfile no longer ours, leaving it");
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("failed to remove {}: {e}", self.path.display());
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn process_running(pid: u32) -> bool {
    // pid 0 and values past pid_t::MAX would address process groups.
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_running(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn contents(dir: &TempDir) -> Option<String> {
        std::fs::read_to_string(dir.path().join(PIDFILE)).ok()
    }

    #[test]
    fn test_claim_writes_pid_and_drop_removes() {
        let dir = TempDir::new().unwrap();
        let claim = ServePidfile::claim(dir.path()).unwrap();
        assert_eq!(contents(&dir), Some(std::process::id().to_string()));
        drop(claim);
        assert_eq!(contents(&dir), None);
    }

    #[test]
    fn test_drop_leaves_file_taken_over_by_another_server() {
        let dir = TempDir::new().unwrap();
        let claim = ServePidfile::claim_as(dir.path(), 4_000_001).unwrap();
        std::fs::write(dir.path().join(PIDFILE), "4000002").unwrap();
        drop(claim);
        assert_eq!(contents(&dir).as_deref(), Some("4000002"));
    }

    #[test]
    fn test_claim_replaces_garbage_and_dead_pids() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PIDFILE), "not a pid").unwrap();
        let claim = ServePidfile::claim_as(dir.path(), 4_000_003).unwrap();
        assert_eq!(contents(&dir).as_deref(), Some("4000003"));
        drop(claim);

        std::fs::write(dir.path().join(PIDFILE), "4000004").unwrap();
        let claim = ServePidfile::claim_as(dir.path(), 4_000_005).unwrap();
        assert_eq!(contents(&dir).as_deref(), Some("4000005"));
        drop(claim);
        assert_eq!(contents(&dir), None);
    }

    #[test]
    fn test_claim_in_missing_dir_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ServePidfile::claim(&dir.path().join("absent")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_running() {
        assert!(process_running(std::process::id()));
        assert!(!process_running(0));
        assert!(!process_running(u32::MAX));
    }
}
