//! Cache engine: hit/miss decision, compilation, replication and recovery

use crate::digest::{does_not_exist, sha256_file};
use crate::entry::{self, CacheEntry};
use crate::invocation::CompileInvocation;
use crate::lock::EntryLock;
use crate::logger::Logger;
use crate::metadata::{
    ExecInfo, FileInfo, collect_file_infos, load_exec_info, load_file_infos, modified_utc,
    save_exec_info, save_file_infos,
};
use crate::options::{self, DESTINATION, HEADERS};
use crate::replicate::{CopyStats, replicate};
use crate::runner::{Runner, validate_compiler, write_argfile};
use crate::{Error, Result, log_info};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// Tunables for [`CacheEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Rewritten argument lists longer than this are passed through an `@file`
    pub argfile_threshold: usize,
    /// Argument that makes the compiler print its identity
    pub version_probe_arg: String,
    /// Prefix the identity output must start with
    pub expected_program: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            argfile_threshold: 32,
            version_probe_arg: "-version".to_string(),
            expected_program: "javac".to_string(),
        }
    }
}

/// Outcome of comparing recorded sources with the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceCheck {
    /// Every source still has its recorded modification time
    Unchanged,
    /// A source's timestamp moved but its content did not
    Touched {
        index: usize,
        mod_time: DateTime<Utc>,
    },
    /// A source is gone, unreadable or different
    Stale,
}

/// Fingerprint addressed compile cache rooted at one base directory
pub struct CacheEngine {
    base_dir: PathBuf,
    runner: Arc<dyn Runner>,
    logger: Arc<dyn Logger>,
    config: EngineConfig,
}

impl CacheEngine {
    /// Create an engine with the default [`EngineConfig`]
    #[must_use]
    pub fn new(
        base_dir: impl Into<PathBuf>,
        runner: Arc<dyn Runner>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            runner,
            logger,
            config: EngineConfig::default(),
        }
    }

    /// Replace the engine configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Root directory holding every entry
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Layout of the entry for `key`, whether or not it exists
    #[must_use]
    pub fn entry(&self, key: &str) -> CacheEntry {
        CacheEntry::new(&self.base_dir, key)
    }

    /// Existing entry for `key`
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        entry::lookup(key, &self.base_dir)
    }

    /// Serve `invocation` from the cache, compiling on a miss.
    ///
    /// Any failure wipes the entry and the whole sequence is retried once
    /// from a clean state. A second failure is returned to the caller and
    /// the entry is wiped again so nothing half-written survives.
    #[instrument(skip_all, fields(fingerprint = %invocation.fingerprint))]
    pub fn execute(&self, invocation: &CompileInvocation) -> Result<ExecInfo> {
        let _lock = EntryLock::acquire(&self.base_dir, &invocation.fingerprint)?;
        let entry = self.entry(&invocation.fingerprint);

        let first = match self.execute_once(invocation, &entry) {
            Ok(info) => return Ok(info),
            Err(e) => e,
        };

        debug!(error = %first, "Cache execution failed; clearing entry and retrying");
        log_info!(self.logger, "execution failed, clearing entry and retrying: {first}");
        if let Err(e) = entry.remove() {
            debug!(error = %e, "Failed to clear cache entry");
            log_info!(self.logger, "failed to clear cache entry: {e}");
            return Err(first);
        }

        self.execute_once(invocation, &entry).inspect_err(|_| {
            if let Err(e) = entry.remove() {
                debug!(error = %e, "Failed to clear cache entry after retry");
                log_info!(self.logger, "failed to clear cache entry after retry: {e}");
            }
        })
    }

    /// Remove the entry for `key`
    pub fn evict(&self, key: &str) -> Result<()> {
        let _lock = EntryLock::acquire(&self.base_dir, key)?;
        self.entry(key).remove()
    }

    /// Remove the whole base directory
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.base_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(e, &self.base_dir, "remove_dir_all")),
        }
    }

    /// Decide whether `entry` must be rebuilt.
    ///
    /// Missing or unreadable metadata means a rebuild. Otherwise each
    /// recorded source is compared by modification time, falling back to its
    /// digest when the time differs. A digest match accepts the entry and
    /// refreshes the recorded time so the next check stays cheap.
    pub fn needs_recompilation(&self, entry: &CacheEntry) -> bool {
        let sources_path = entry.sources_path();
        for (path, what) in [
            (&entry.path, "cache entry"),
            (&sources_path, "source records"),
            (&entry.result_path(), "result record"),
        ] {
            if does_not_exist(path) {
                log_info!(self.logger, "{what} does not exist: {}", path.display());
                return true;
            }
        }

        let mut infos = match load_file_infos(&sources_path) {
            Ok(infos) => infos,
            Err(e) => {
                log_info!(self.logger, "Failed to read source records. Recompiling. {e}");
                return true;
            }
        };

        match self.check_sources(&infos) {
            SourceCheck::Unchanged => false,
            SourceCheck::Stale => true,
            SourceCheck::Touched { index, mod_time } => {
                infos[index].mod_time = mod_time;
                if let Err(e) = save_file_infos(&sources_path, &infos) {
                    debug!(error = %e, "Failed to refresh source records");
                    log_info!(self.logger, "failed to refresh source records: {e}");
                }
                false
            }
        }
    }

    fn check_sources(&self, infos: &[FileInfo]) -> SourceCheck {
        for (index, info) in infos.iter().enumerate() {
            let current = match modified_utc(&info.path) {
                Ok(time) => time,
                Err(e) => {
                    log_info!(self.logger, "Failed to stat {}. Recompiling. {e}", info.path.display());
                    return SourceCheck::Stale;
                }
            };
            if current == info.mod_time {
                continue;
            }

            log_info!(
                self.logger,
                "{} has been changed. modified: {current} - cached: {}",
                info.path.display(),
                info.mod_time
            );
            return match sha256_file(&info.path) {
                Ok(digest) if digest == info.sha256 => {
                    log_info!(self.logger, "Found identical digest. NOT recompiling.");
                    SourceCheck::Touched {
                        index,
                        mod_time: current,
                    }
                }
                Ok(_) => SourceCheck::Stale,
                Err(e) => {
                    log_info!(self.logger, "Failed to hash {}. {e}", info.path.display());
                    SourceCheck::Stale
                }
            };
        }
        SourceCheck::Unchanged
    }

    fn execute_once(&self, invocation: &CompileInvocation, entry: &CacheEntry) -> Result<ExecInfo> {
        let start = Instant::now();
        log_info!(
            self.logger,
            "{} {}",
            invocation.compiler_path.display(),
            invocation.original_args.join(" ")
        );

        entry.ensure_dirs()?;
        for dir in [
            &invocation.destination_dir,
            &invocation.header_dir,
            &invocation.generated_dir,
        ]
        .into_iter()
        .flatten()
        {
            fs::create_dir_all(dir).map_err(|e| Error::io(e, dir, "create_dir_all"))?;
        }

        let info = if self.needs_recompilation(entry) {
            log_info!(self.logger, "cache-miss");
            self.compile(invocation, entry)?
        } else {
            log_info!(self.logger, "cache-hit");
            load_exec_info(&entry.result_path())?
        };

        let stats = replicate_artifacts(invocation, entry)?;
        log_info!(
            self.logger,
            "served {} bytes in {} files ({} already up to date)",
            stats.bytes_copied,
            stats.files_copied,
            stats.files_skipped
        );
        log_info!(self.logger, "finished in {:?}", start.elapsed());

        Ok(info)
    }

    fn compile(&self, invocation: &CompileInvocation, entry: &CacheEntry) -> Result<ExecInfo> {
        validate_compiler(
            self.runner.as_ref(),
            &invocation.compiler_path,
            &self.config.version_probe_arg,
            &self.config.expected_program,
        )?;

        entry.remove()?;
        entry.ensure_dirs()?;

        let sources = collect_file_infos(&invocation.sources)?;
        save_file_infos(&entry.sources_path(), &sources)?;

        let args = redirect_args(invocation, entry);
        let started = Instant::now();
        let info = self.run_compiler(&invocation.compiler_path, &args)?;
        log_info!(
            self.logger,
            "compiler exited with {} after {:?}",
            info.exit_code,
            started.elapsed()
        );

        let outputs = collect_outputs(entry)?;
        save_file_infos(&entry.outputs_path(), &outputs)?;
        save_exec_info(&entry.result_path(), &info)?;

        Ok(info)
    }

    fn run_compiler(&self, compiler: &Path, args: &[String]) -> Result<ExecInfo> {
        if args.len() <= self.config.argfile_threshold {
            return self.runner.run(compiler, args);
        }

        let argfile = write_argfile(args)?;
        let reference = format!("@{}", argfile.path().display());
        debug!(
            argfile = %argfile.path().display(),
            args = args.len(),
            "Passing arguments through file"
        );
        log_info!(self.logger, "{} {reference}", compiler.display());
        self.runner.run(compiler, &[reference])
    }
}

/// Mirror both artifact trees into the caller's directories concurrently
fn replicate_artifacts(invocation: &CompileInvocation, entry: &CacheEntry) -> Result<CopyStats> {
    let recorded = recorded_digests(entry);
    let classes_src = entry.classes_dir();
    let headers_src = entry.headers_dir();
    let classes_dst = destination_or_cwd(invocation.destination_dir.as_deref());
    let headers_dst = destination_or_cwd(invocation.header_dir.as_deref());

    let (classes, headers) = rayon::join(
        || replicate(&classes_src, classes_dst, &recorded),
        || replicate(&headers_src, headers_dst, &recorded),
    );
    Ok(classes? + headers?)
}

/// Point `-d` (always) and `-h` (only if given) at the entry's trees
fn redirect_args(invocation: &CompileInvocation, entry: &CacheEntry) -> Vec<String> {
    if invocation.flat_args.is_empty() {
        return invocation.original_args.clone();
    }

    let classes = entry.classes_dir().to_string_lossy().into_owned();
    let headers = entry.headers_dir().to_string_lossy().into_owned();
    let args = options::redirect(&invocation.flat_args, &DESTINATION, &classes, true);
    // -h switches javac into header generation mode, so it is never added
    options::redirect(&args, &HEADERS, &headers, false)
}

/// Records for every file under the entry's artifact trees
fn collect_outputs(entry: &CacheEntry) -> Result<Vec<FileInfo>> {
    let mut outputs = Vec::new();
    for tree in [entry.classes_dir(), entry.headers_dir()] {
        for item in WalkDir::new(&tree).sort_by_file_name() {
            let item = item.map_err(|e| Error::io(e.into(), &tree, "walk"))?;
            if item.file_type().is_dir() {
                continue;
            }
            let mut info = FileInfo::capture(item.path())?;
            if let Ok(rel) = item.path().strip_prefix(&entry.path) {
                info.path = rel.to_path_buf();
            }
            outputs.push(info);
        }
    }
    Ok(outputs)
}

/// Artifact digests keyed by their path inside the entry
fn recorded_digests(entry: &CacheEntry) -> HashMap<PathBuf, String> {
    match load_file_infos(&entry.outputs_path()) {
        Ok(infos) => infos
            .into_iter()
            .map(|info| (entry.path.join(&info.path), info.sha256))
            .collect(),
        Err(e) => {
            debug!(error = %e, "No artifact records; copying every file");
            HashMap::new()
        }
    }
}

fn destination_or_cwd(dir: Option<&Path>) -> &Path {
    dir.unwrap_or_else(|| Path::new("."))
}
