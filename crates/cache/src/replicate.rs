//! Mirroring cached artifact trees into caller destinations

use crate::digest::{copy_file, sha256_file};
use crate::{Error, Result};
use std::collections::HashMap;
use std::ops::{Add, AddAssign};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Counters for one or more replications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Files written to the destination
    pub files_copied: usize,
    /// Bytes written to the destination
    pub bytes_copied: u64,
    /// Files left alone because the destination already matched
    pub files_skipped: usize,
}

impl Add for CopyStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            files_copied: self.files_copied + rhs.files_copied,
            bytes_copied: self.bytes_copied + rhs.bytes_copied,
            files_skipped: self.files_skipped + rhs.files_skipped,
        }
    }
}

impl AddAssign for CopyStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Copy every file under `src_tree` to the same relative path under `dst_tree`.
///
/// `recorded` maps source files to their known digests. A destination file
/// whose digest equals the recorded one is skipped, which leaves its
/// timestamp untouched. Anything in the tree that is neither a directory nor
/// a regular file is an error.
pub fn replicate(
    src_tree: &Path,
    dst_tree: &Path,
    recorded: &HashMap<PathBuf, String>,
) -> Result<CopyStats> {
    let mut stats = CopyStats::default();

    for entry in WalkDir::new(src_tree).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| src_tree.to_path_buf(), Path::to_path_buf);
            Error::io(e.into(), path, "walk")
        })?;
        let src = entry.path();
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            return Err(Error::NotRegular {
                path: src.to_path_buf(),
            });
        }

        let rel = src.strip_prefix(src_tree).map_err(|_| {
            Error::configuration(format!(
                "path {} is not under {}",
                src.display(),
                src_tree.display()
            ))
        })?;
        let dst = dst_tree.join(rel);

        if is_up_to_date(&dst, recorded.get(src)) {
            stats.files_skipped += 1;
            continue;
        }

        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create_dir_all"))?;
        }
        let expected = entry
            .metadata()
            .map_err(|e| Error::io(e.into(), src, "stat"))?
            .len();
        let written = copy_file(src, &dst)?;
        if written != expected {
            return Err(Error::PartialCopy {
                path: src.to_path_buf(),
                written,
                expected,
            });
        }

        stats.files_copied += 1;
        stats.bytes_copied += written;
    }

    Ok(stats)
}

fn is_up_to_date(dst: &Path, recorded: Option<&String>) -> bool {
    let Some(recorded) = recorded else {
        return false;
    };
    dst.is_file() && sha256_file(dst).is_ok_and(|digest| &digest == recorded)
}
