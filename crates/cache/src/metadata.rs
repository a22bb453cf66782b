//! Persisted records for cache entries
//!
//! Two record kinds live in every entry:
//! - [`FileInfo`] lists, one for the sources that produced the entry and one
//!   for the artifacts the compiler wrote
//! - a single [`ExecInfo`] holding what the compiler printed and returned
//!
//! Records are stored as pretty-printed JSON. Unknown fields are rejected on
//! read so that format drift shows up as a corrupt entry (and a rebuild)
//! instead of silently decoding to defaults.

use crate::digest::sha256_file;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Staleness record for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileInfo {
    /// Path of the file, as it was given on the command line for sources
    /// and relative to the entry root for artifacts
    pub path: PathBuf,
    /// Modification time, normalized to UTC
    pub mod_time: DateTime<Utc>,
    /// SHA-256 hex digest of the contents
    pub sha256: String,
}

impl FileInfo {
    /// Stat and hash `path` as it is right now
    pub fn capture(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            mod_time: modified_utc(path)?,
            sha256: sha256_file(path)?,
        })
    }
}

/// Captured result of one compiler run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecInfo {
    /// Everything the process wrote to stdout, byte for byte
    #[serde(with = "output_bytes")]
    pub stdout: Vec<u8>,
    /// Everything the process wrote to stderr, byte for byte
    #[serde(with = "output_bytes")]
    pub stderr: Vec<u8>,
    /// Process exit code
    pub exit_code: i32,
}

impl ExecInfo {
    /// Stdout followed by stderr, decoded lossily for display
    #[must_use]
    pub fn combined(&self) -> String {
        let mut combined = Vec::with_capacity(self.stdout.len() + self.stderr.len());
        combined.extend_from_slice(&self.stdout);
        combined.extend_from_slice(&self.stderr);
        String::from_utf8_lossy(&combined).into_owned()
    }
}

/// Process output as a JSON string when it is valid UTF-8, otherwise as an
/// array of bytes
mod output_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Text(String),
        Raw(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(bytes) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.collect_seq(bytes),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(match Stored::deserialize(deserializer)? {
            Stored::Text(text) => text.into_bytes(),
            Stored::Raw(bytes) => bytes,
        })
    }
}

/// Modification time of `path` in UTC
pub fn modified_utc(path: &Path) -> Result<DateTime<Utc>> {
    let meta = fs::metadata(path).map_err(|e| Error::io(e, path, "stat"))?;
    let modified = meta.modified().map_err(|e| Error::io(e, path, "stat"))?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Capture a [`FileInfo`] for every path, preserving order
pub fn collect_file_infos<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FileInfo>> {
    paths.iter().map(|p| FileInfo::capture(p.as_ref())).collect()
}

/// Write a list of file records
pub fn save_file_infos(path: &Path, infos: &[FileInfo]) -> Result<()> {
    write_json(path, &infos)
}

/// Read a list of file records
pub fn load_file_infos(path: &Path) -> Result<Vec<FileInfo>> {
    read_json(path)
}

/// Write the captured compiler result
pub fn save_exec_info(path: &Path, info: &ExecInfo) -> Result<()> {
    write_json(path, info)
}

/// Read the captured compiler result
pub fn load_exec_info(path: &Path) -> Result<ExecInfo> {
    read_json(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| {
        Error::serialization(format!("Failed to serialize {}: {e}", path.display()))
    })?;
    fs::write(path, json).map_err(|e| Error::io(e, path, "write"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read(path).map_err(|e| Error::io(e, path, "read"))?;
    serde_json::from_slice(&content)
        .map_err(|e| Error::serialization(format!("Failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_records_digest_and_mtime() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("Foo.java");
        fs::write(&src, "class Foo {}").unwrap();

        let info = FileInfo::capture(&src).unwrap();
        assert_eq!(info.path, src);
        assert_eq!(info.sha256, sha256_file(&src).unwrap());
        assert_eq!(info.mod_time, modified_utc(&src).unwrap());
    }

    #[test]
    fn test_capture_missing_file_errors() {
        let temp = TempDir::new().unwrap();
        assert!(FileInfo::capture(&temp.path().join("Nope.java")).is_err());
    }

    #[test]
    fn test_file_infos_persist_in_order() {
        let temp = TempDir::new().unwrap();
        let b = temp.path().join("B.java");
        let a = temp.path().join("A.java");
        fs::write(&b, "class B {}").unwrap();
        fs::write(&a, "class A {}").unwrap();

        let infos = collect_file_infos(&[&b, &a]).unwrap();
        let meta = temp.path().join("sources.json");
        save_file_infos(&meta, &infos).unwrap();

        let loaded = load_file_infos(&meta).unwrap();
        assert_eq!(loaded, infos);
        assert_eq!(loaded[0].path, b);
    }

    #[test]
    fn test_exec_info_keeps_text_readable() {
        let temp = TempDir::new().unwrap();
        let meta = temp.path().join("result.json");
        let info = ExecInfo {
            stdout: Vec::new(),
            stderr: b"Foo.java:3: error: reached end of file while parsing\n}\n ^\n".to_vec(),
            exit_code: 1,
        };

        save_exec_info(&meta, &info).unwrap();
        let json = fs::read_to_string(&meta).unwrap();
        assert!(json.contains("reached end of file while parsing"));
        assert_eq!(load_exec_info(&meta).unwrap(), info);
    }

    #[test]
    fn test_exec_info_keeps_non_utf8_bytes() {
        let temp = TempDir::new().unwrap();
        let meta = temp.path().join("result.json");
        let info = ExecInfo {
            stdout: vec![0xff, 0xfe, b'e', b'r', b'r'],
            stderr: b"Fehler: \xe4\xf6\xfc\n".to_vec(),
            exit_code: 1,
        };

        save_exec_info(&meta, &info).unwrap();
        let loaded = load_exec_info(&meta).unwrap();
        assert_eq!(loaded.stdout, vec![0xff, 0xfe, b'e', b'r', b'r']);
        assert_eq!(loaded, info);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let temp = TempDir::new().unwrap();
        let meta = temp.path().join("result.json");
        fs::write(
            &meta,
            r#"{"stdout":"","stderr":"","exit_code":0,"duration_ms":12}"#,
        )
        .unwrap();

        let err = load_exec_info(&meta).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn test_combined_output_is_stdout_then_stderr() {
        let info = ExecInfo {
            stdout: b"out ".to_vec(),
            stderr: b"err".to_vec(),
            exit_code: 0,
        };
        assert_eq!(info.combined(), "out err");
    }
}
