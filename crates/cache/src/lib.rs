//! Transparent result cache for javac invocations
//!
//! This crate sits between a build tool and the Java compiler:
//! - Fingerprints an invocation from the compiler binary and its flattened arguments
//! - Decides hit or miss by comparing recorded sources with the filesystem
//! - Compiles into a private entry on a miss and records outputs and result
//! - Mirrors the cached artifacts into the caller's directories, skipping unchanged files
//!
//! # Overview
//!
//! Each entry lives under `<base>/<fingerprint>/`:
//! - `classes/` and `headers/`: artifacts written by the compiler
//! - `sources.json`: path, modification time and digest of every source
//! - `outputs.json`: the same for every artifact
//! - `result.json`: captured stdout, stderr and exit code
//!
//! `result.json` is written last, so an entry without it is never served.
//!
//! # Recovery
//!
//! [`CacheEngine::execute`] wipes the entry and retries once after any
//! failure. Concurrent executions of the same fingerprint are serialized by
//! an advisory lock beside the entry.

#![expect(
    clippy::missing_errors_doc,
    reason = "Every fallible function returns the crate Error"
)]

mod error;

pub mod digest;
pub mod engine;
pub mod entry;
pub mod invocation;
pub mod lock;
pub mod logger;
pub mod metadata;
pub mod options;
pub mod replicate;
pub mod runner;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use engine::{CacheEngine, EngineConfig};
pub use entry::{CacheEntry, key_to_path, lookup};
pub use invocation::{CompileInvocation, compute_fingerprint};
pub use logger::{FileLogger, Logger, LoggerChain, NullLogger, TracingLogger};
pub use metadata::{ExecInfo, FileInfo};
pub use replicate::CopyStats;
pub use runner::{ProcessRunner, Runner};
