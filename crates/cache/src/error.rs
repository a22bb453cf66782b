//! Error types for the compile cache

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for compile cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during cache operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(javac_cache::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "create_dir_all")
        operation: String,
    },

    /// Invalid command line handed to the cache
    #[error("Invalid invocation: {message}")]
    #[diagnostic(code(javac_cache::config))]
    Configuration {
        /// Error message describing the problem
        message: String,
    },

    /// The compiler path does not exist or cannot be resolved
    #[error("Cannot run '{}'", path.display())]
    #[diagnostic(
        code(javac_cache::compiler_not_found),
        help("Pass the path of a javac executable as the first argument")
    )]
    CompilerNotFound {
        /// The path given for the compiler
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An `@file` argument could not be read
    #[error("Cannot read argument file '{}'", path.display())]
    #[diagnostic(code(javac_cache::argfile))]
    ArgFile {
        /// The referenced argument file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The executable failed the version probe
    #[error("Invalid compiler '{}': unexpected version output", path.display())]
    #[diagnostic(
        code(javac_cache::invalid_compiler),
        help("The configured executable does not identify itself as javac:\n{combined_output}")
    )]
    InvalidCompiler {
        /// The compiler path that was probed
        path: PathBuf,
        /// Combined stdout and stderr of the probe
        combined_output: String,
    },

    /// The compiler process could not be started
    #[error("Failed to launch '{}'", program.display())]
    #[diagnostic(code(javac_cache::launch))]
    Launch {
        /// The program that was executed
        program: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(javac_cache::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },

    /// A cached artifact tree contains something other than files and directories
    #[error("File not regular: {}", path.display())]
    #[diagnostic(
        code(javac_cache::not_regular),
        help("Cache entries may only contain plain files; the entry will be rebuilt")
    )]
    NotRegular {
        /// The offending path
        path: PathBuf,
    },

    /// Fewer bytes were written than the source file holds
    #[error("Partial copy ({written}/{expected} bytes): {}", path.display())]
    #[diagnostic(
        code(javac_cache::partial_copy),
        help("Check for a full disk at the destination")
    )]
    PartialCopy {
        /// The source file being copied
        path: PathBuf,
        /// Bytes actually written
        written: u64,
        /// Size of the source file
        expected: u64,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }
}

/// Result type for compile cache operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_includes_path() {
        let err = Error::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/cache/result.json",
            "read",
        );
        let msg = err.to_string();
        assert!(msg.contains("I/O read failed"));
        assert!(msg.contains("result.json"));
    }

    #[test]
    fn test_io_error_without_path() {
        let err = Error::io_no_path(std::io::Error::other("boom"), "tempfile");
        assert_eq!(err.to_string(), "I/O tempfile failed");
    }

    #[test]
    fn test_partial_copy_display() {
        let err = Error::PartialCopy {
            path: PathBuf::from("classes/Foo.class"),
            written: 10,
            expected: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("10/42"));
        assert!(msg.contains("Foo.class"));
    }

    #[test]
    fn test_invalid_compiler_keeps_probe_output() {
        let err = Error::InvalidCompiler {
            path: PathBuf::from("/usr/bin/java"),
            combined_output: "openjdk version \"17\"".to_string(),
        };
        assert!(err.to_string().contains("/usr/bin/java"));
        let help = miette::Diagnostic::help(&err).map(|h| h.to_string());
        assert!(help.is_some_and(|h| h.contains("openjdk")));
    }
}
