//! Advisory single-writer lock for the workbook.
//!
//! The lock is a sibling file (`data.xlsx.lock`) created exclusively; it is
//! removed when the guard is dropped.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::error::StoreError;

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Lock files older than this are left over from a crashed writer.
const STALE_AFTER: Duration = Duration::from_secs(300);

static CLAIMS: AtomicUsize = AtomicUsize::new(0);

/// Held while a process reads and rewrites the workbook.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Lock file path for a workbook.
    pub fn lock_path(store_path: &Path) -> PathBuf {
        let mut name = store_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire the lock, waiting up to `timeout`.
    pub fn acquire(store_path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        let path = Self::lock_path(store_path);
        let deadline = Instant::now() + timeout;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", owner_tag()) {
                        warn!("Could not record owner in {}: {}", path.display(), e);
                    }
                    debug!("Acquired store lock {}", path.display());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(stale) = LockSnapshot::stale(&path) {
                        remove_stale(&path, &stale);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(StoreError::Locked(path));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
    }
}

/// Identifies one acquisition: pid, time and a per-process counter.
fn owner_tag() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!(
        "{} {} {}",
        std::process::id(),
        nanos,
        CLAIMS.fetch_add(1, Ordering::Relaxed)
    )
}

/// What a lock file looked like when it was judged stale.
#[derive(Debug, PartialEq)]
struct LockSnapshot {
    modified: SystemTime,
    owner: String,
}

impl LockSnapshot {
    fn read(path: &Path) -> Option<Self> {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        let owner = fs::read_to_string(path).ok()?;
        Some(Self { modified, owner })
    }

    /// Snapshot of the lock file if it is stale.
    fn stale(path: &Path) -> Option<Self> {
        let snapshot = Self::read(path)?;
        let age = snapshot.modified.elapsed().ok()?;
        (age > STALE_AFTER).then_some(snapshot)
    }
}

/// Remove a stale lock unless another waiter got to it first.
///
/// The lock is renamed away, which only one waiter can do. If the renamed
/// file is not the stale one, a live lock was taken and is put back.
fn remove_stale(path: &Path, stale: &LockSnapshot) {
    let mut claimed = path.as_os_str().to_owned();
    claimed.push(format!(".stale-{}", owner_tag().replace(' ', "-")));
    let claimed = PathBuf::from(claimed);

    if let Err(e) = fs::rename(path, &claimed) {
        debug!("Stale lock {} already gone: {}", path.display(), e);
        return;
    }

    if LockSnapshot::read(&claimed).as_ref() == Some(stale) {
        warn!("Removed stale store lock {}", path.display());
    } else if let Err(e) = fs::hard_link(&claimed, path) {
        // Someone else holds the lock again; theirs wins.
        debug!("Could not restore live lock {}: {}", path.display(), e);
    }

    if let Err(e) = fs::remove_file(&claimed) {
        warn!("Could not remove {}: {}", claimed.display(), e);
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Could not remove store lock {}: {}", self.path.display(), e);
        }
    }
}
