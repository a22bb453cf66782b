//! Content hashing and byte-exact file copies

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Compute the hex encoded SHA-256 digest of a file's contents
pub fn sha256_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io(e, path, "read"))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Copy `from` to `to`, truncating any existing destination.
///
/// Returns the number of bytes written.
pub fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    let mut src = fs::File::open(from).map_err(|e| Error::io(e, from, "open"))?;
    let mut dst = fs::File::create(to).map_err(|e| Error::io(e, to, "create"))?;
    io::copy(&mut src, &mut dst).map_err(|e| Error::io(e, to, "copy"))
}

/// `true` only when stat reports the path as missing
#[must_use]
pub fn does_not_exist(path: &Path) -> bool {
    matches!(fs::metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_matches_known_vector() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_of_missing_file_errors() {
        let temp = TempDir::new().unwrap();
        assert!(sha256_file(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_copy_file_overwrites_and_reports_size() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("from.bin");
        let to = temp.path().join("to.bin");
        fs::write(&from, b"fresh bytes").unwrap();
        fs::write(&to, b"stale contents that are longer").unwrap();

        let written = copy_file(&from, &to).unwrap();
        assert_eq!(written, 11);
        assert_eq!(fs::read(&to).unwrap(), b"fresh bytes");
    }

    #[test]
    fn test_does_not_exist_distinguishes_files() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("present");
        fs::write(&present, b"").unwrap();

        assert!(!does_not_exist(&present));
        assert!(!does_not_exist(temp.path()));
        assert!(does_not_exist(&temp.path().join("absent")));
    }
}
