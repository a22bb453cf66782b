//! On-disk layout of a cache entry

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory receiving class files (`-d`)
pub const CLASSES_DIR: &str = "classes";
/// Subdirectory receiving native headers (`-h`)
pub const HEADERS_DIR: &str = "headers";
/// Source staleness records
pub const SOURCES_FILE: &str = "sources.json";
/// Artifact records
pub const OUTPUTS_FILE: &str = "outputs.json";
/// Captured compiler result, written last
pub const RESULT_FILE: &str = "result.json";

/// A cache entry addressed by its fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The fingerprint naming this entry
    pub key: String,
    /// Path to the entry directory
    pub path: PathBuf,
}

impl CacheEntry {
    /// Entry for `key` under `root`; nothing is created on disk
    #[must_use]
    pub fn new(root: &Path, key: &str) -> Self {
        Self {
            key: key.to_string(),
            path: key_to_path(key, root),
        }
    }

    /// Compiled output tree
    #[must_use]
    pub fn classes_dir(&self) -> PathBuf {
        self.path.join(CLASSES_DIR)
    }

    /// Native header tree
    #[must_use]
    pub fn headers_dir(&self) -> PathBuf {
        self.path.join(HEADERS_DIR)
    }

    /// Source records file
    #[must_use]
    pub fn sources_path(&self) -> PathBuf {
        self.path.join(SOURCES_FILE)
    }

    /// Artifact records file
    #[must_use]
    pub fn outputs_path(&self) -> PathBuf {
        self.path.join(OUTPUTS_FILE)
    }

    /// Compiler result file
    #[must_use]
    pub fn result_path(&self) -> PathBuf {
        self.path.join(RESULT_FILE)
    }

    /// Create the entry directory and both artifact trees if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.classes_dir(), self.headers_dir()] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(e, &dir, "create_dir_all"))?;
        }
        Ok(())
    }

    /// Recursively delete the entry; a missing entry is not an error
    pub fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(e, &self.path, "remove_dir_all")),
        }
    }
}

/// Convert a fingerprint to its storage path
#[must_use]
pub fn key_to_path(key: &str, root: &Path) -> PathBuf {
    root.join(key)
}

/// Look up an existing cache entry by fingerprint
#[must_use]
pub fn lookup(key: &str, root: &Path) -> Option<CacheEntry> {
    let entry = CacheEntry::new(root, key);
    entry.path.is_dir().then_some(entry)
}
