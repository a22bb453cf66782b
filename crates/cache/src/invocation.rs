//! Parsing a raw compiler command line into a [`CompileInvocation`]

use crate::options::{self, DESTINATION, GENERATED, HEADERS, SOURCE_PATH};
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Minimum number of raw arguments: the compiler path itself
pub const MIN_ARGS: usize = 1;

/// A fully resolved compiler invocation.
///
/// Produced by [`CompileInvocation::parse`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileInvocation {
    /// Compiler executable with symlinks resolved
    pub compiler_path: PathBuf,
    /// Arguments as given, quotes removed, compiler path excluded
    pub original_args: Vec<String>,
    /// `original_args` with `@file` references expanded one level
    pub flat_args: Vec<String>,
    /// Non-flag tokens that name existing files
    pub sources: Vec<PathBuf>,
    /// Entries of `--source-path` / `-sourcepath`
    pub source_path_dirs: Vec<PathBuf>,
    /// Value of `-d`
    pub destination_dir: Option<PathBuf>,
    /// Value of `-h`
    pub header_dir: Option<PathBuf>,
    /// Value of `-s`
    pub generated_dir: Option<PathBuf>,
    /// Cache key for this invocation
    pub fingerprint: String,
}

impl CompileInvocation {
    /// Parse `raw_args`, whose first element is the compiler path.
    ///
    /// Reads the filesystem (stat, symlink resolution, `@file` contents) but
    /// never writes to it.
    pub fn parse<S: AsRef<str>>(raw_args: &[S]) -> Result<Self> {
        if raw_args.len() < MIN_ARGS {
            return Err(Error::configuration("missing compiler to run"));
        }

        let compiler_path = resolve_compiler(Path::new(raw_args[0].as_ref()))?;
        let compiler_mtime = compiler_mod_time(&compiler_path)?;

        let original_args: Vec<String> = raw_args[MIN_ARGS..]
            .iter()
            .map(|arg| clean_arg(arg.as_ref()))
            .collect();
        let flat_args = flatten_args(&original_args)?;

        let source_path_dirs = options::value_of(&flat_args, &SOURCE_PATH)
            .map(|sp| {
                std::env::split_paths(sp)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let sources = find_source_files(&flat_args);
        let option_dir = |opt| options::value_of(&flat_args, opt).map(PathBuf::from);
        let destination_dir = option_dir(&DESTINATION);
        let header_dir = option_dir(&HEADERS);
        let generated_dir = option_dir(&GENERATED);

        let fingerprint = compute_fingerprint(&compiler_path, compiler_mtime, &flat_args);

        Ok(Self {
            compiler_path,
            original_args,
            flat_args,
            sources,
            source_path_dirs,
            destination_dir,
            header_dir,
            generated_dir,
            fingerprint,
        })
    }
}

/// Derive the cache key of an invocation.
///
/// Every component is NUL terminated so token boundaries are hashed too.
#[must_use]
pub fn compute_fingerprint(
    compiler_path: &Path,
    compiler_mtime: DateTime<Utc>,
    flat_args: &[String],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(compiler_path.to_string_lossy().as_bytes());
    hasher.update([0]);
    hasher.update(
        compiler_mtime
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
            .as_bytes(),
    );
    hasher.update([0]);
    for arg in flat_args {
        hasher.update(arg.as_bytes());
        hasher.update([0]);
    }
    hex::encode(hasher.finalize())
}

fn resolve_compiler(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|source| Error::CompilerNotFound {
        path: path.to_path_buf(),
        source,
    })
}

fn compiler_mod_time(path: &Path) -> Result<DateTime<Utc>> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| Error::CompilerNotFound {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Strip double quotes and surrounding whitespace
fn clean_arg(arg: &str) -> String {
    arg.replace('"', "").trim().to_string()
}

/// Expand `@file` tokens into the whitespace separated fields of the file.
///
/// Only one level is expanded; `@` tokens inside an argument file are kept
/// as they are.
fn flatten_args(args: &[String]) -> Result<Vec<String>> {
    let mut flat = Vec::with_capacity(args.len());
    for arg in args {
        let arg = arg.trim();
        if arg.is_empty() {
            continue;
        }

        if let Some(file) = arg.strip_prefix('@') {
            let content = fs::read_to_string(file).map_err(|source| Error::ArgFile {
                path: PathBuf::from(file),
                source,
            })?;
            flat.extend(
                content
                    .split_whitespace()
                    .map(clean_arg)
                    .filter(|field| !field.is_empty()),
            );
        } else {
            flat.push(arg.to_string());
        }
    }
    Ok(flat)
}

/// Tokens that are not flags and resolve to regular files
fn find_source_files(flat_args: &[String]) -> Vec<PathBuf> {
    flat_args
        .iter()
        .filter(|arg| !arg.starts_with('-'))
        .filter(|arg| fs::metadata(arg).is_ok_and(|meta| meta.is_file()))
        .map(PathBuf::from)
        .collect()
}
