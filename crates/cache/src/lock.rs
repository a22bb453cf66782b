//! Per-fingerprint mutual exclusion
//!
//! Two identical compiler invocations running at the same time would race on
//! creating and deleting the same entry directory. Each execute therefore
//! holds an exclusive advisory lock on `<base>/<fingerprint>.lock` for its
//! whole duration. The lock file lives beside the entry, not inside it, so
//! removing the entry never removes the lock.

use crate::{Error, Result};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of lock files in the base directory
pub const LOCK_EXTENSION: &str = "lock";

/// Held exclusive lock; released when dropped
#[derive(Debug)]
pub struct EntryLock {
    path: PathBuf,
    _file: File,
}

impl EntryLock {
    /// Block until the lock for `key` under `root` is acquired
    pub fn acquire(root: &Path, key: &str) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| Error::io(e, root, "create_dir_all"))?;
        let path = lock_path(root, key);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(e, &path, "open"))?;

        debug!(lock = %path.display(), "Waiting for entry lock");
        file.lock_exclusive()
            .map_err(|e| Error::io(e, &path, "lock"))?;
        debug!(lock = %path.display(), "Entry lock acquired");

        Ok(Self { path, _file: file })
    }

    /// Path of the lock file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lock file path for `key`
#[must_use]
pub fn lock_path(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{key}.{LOCK_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_lock_file_sits_beside_entry() {
        let temp = TempDir::new().unwrap();
        let lock = EntryLock::acquire(temp.path(), "abc").unwrap();
        assert_eq!(lock.path(), temp.path().join("abc.lock"));
        assert!(lock.path().is_file());
    }

    #[test]
    fn test_lock_can_be_reacquired_after_drop() {
        let temp = TempDir::new().unwrap();
        drop(EntryLock::acquire(temp.path(), "abc").unwrap());
        drop(EntryLock::acquire(temp.path(), "abc").unwrap());
    }

    #[test]
    fn test_second_holder_waits_for_first() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let released = Arc::new(AtomicBool::new(false));

        let first = EntryLock::acquire(&root, "same").unwrap();
        let waiter = {
            let root = root.clone();
            let released = Arc::clone(&released);
            std::thread::spawn(move || {
                let _second = EntryLock::acquire(&root, "same").unwrap();
                released.load(Ordering::SeqCst)
            })
        };

        std::thread::sleep(Duration::from_millis(100));
        released.store(true, Ordering::SeqCst);
        drop(first);

        assert!(waiter.join().unwrap(), "second lock acquired before release");
    }

    #[test]
    fn test_different_keys_do_not_contend() {
        let temp = TempDir::new().unwrap();
        let _a = EntryLock::acquire(temp.path(), "a").unwrap();
        let _b = EntryLock::acquire(temp.path(), "b").unwrap();
    }
}
