//! javac-cache CLI
//!
//! Wraps a javac invocation in a [`CacheEngine`]: the command line is parsed
//! into a [`CompileInvocation`], served from the cache (compiling on a miss),
//! and the recorded stdout, stderr and exit code are replayed so the caller
//! cannot tell the difference from running javac directly.

/// Command line definition, CLI errors and exit codes.
pub mod cli;
/// Cache base directory resolution.
pub mod cache_dir;
/// Tracing and logging configuration.
pub mod tracing;

use crate::cache_dir::CacheDirInputs;
use crate::cli::{Cli, CliError, EXIT_OK};
use javac_cache_core::{
    CacheEngine, CompileInvocation, ExecInfo, FileLogger, Logger, LoggerChain, NullLogger,
    ProcessRunner, TracingLogger,
};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Name of the decision log inside the cache base directory
pub const LOG_FILE: &str = "log.txt";

/// Run the parsed command line and return the process exit code.
///
/// On success this is the exit code of the (possibly replayed) compiler.
pub fn run(cli: &Cli) -> Result<i32, CliError> {
    let base_dir = cache_dir::resolve(CacheDirInputs::from_env(cli.cache_dir.clone()))?;
    ::tracing::debug!(base_dir = %base_dir.display(), "Resolved cache directory");

    if cli.clear {
        CacheEngine::new(&base_dir, Arc::new(ProcessRunner), Arc::new(NullLogger)).clear()?;
        ::tracing::info!(base_dir = %base_dir.display(), "Cleared cache");
        if cli.compiler_command.is_empty() {
            return Ok(EXIT_OK);
        }
    }

    if cli.compiler_command.is_empty() {
        return Err(CliError::config_with_help(
            "missing compiler to run",
            "Usage: javac-cache [OPTIONS] <COMPILER> [ARGS]...",
        ));
    }

    let invocation = CompileInvocation::parse(&cli.compiler_command)?;
    let engine = CacheEngine::new(
        &base_dir,
        Arc::new(ProcessRunner),
        build_logger(&base_dir, cli.verbose),
    );
    let result = engine.execute(&invocation)?;

    replay(&result, &mut io::stdout().lock(), &mut io::stderr().lock())
        .map_err(|e| CliError::cache(format!("Failed to write compiler output: {e}")))?;
    Ok(result.exit_code)
}

/// Decision log for this run.
///
/// Quiet runs log nothing. Verbose runs append to `<base>/log.txt` and emit
/// tracing events; if the file cannot be opened only tracing is used.
#[must_use]
pub fn build_logger(base_dir: &Path, verbose: bool) -> Arc<dyn Logger> {
    if !verbose {
        return Arc::new(NullLogger);
    }

    match FileLogger::open(&base_dir.join(LOG_FILE)) {
        Ok(file) => Arc::new(LoggerChain::new(vec![
            Arc::new(file) as Arc<dyn Logger>,
            Arc::new(TracingLogger) as Arc<dyn Logger>,
        ])),
        Err(e) => {
            ::tracing::warn!(error = %e, "Cannot open cache log; logging to stderr only");
            Arc::new(TracingLogger)
        }
    }
}

/// Write the recorded compiler output verbatim
pub fn replay(result: &ExecInfo, stdout: &mut impl Write, stderr: &mut impl Write) -> io::Result<()> {
    stdout.write_all(&result.stdout)?;
    stdout.flush()?;
    stderr.write_all(&result.stderr)?;
    stderr.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replay_writes_streams_verbatim() {
        let result = ExecInfo {
            stdout: b"Note: Foo.java uses unchecked operations.\n".to_vec(),
            stderr: b"warning: [options] bootstrap class path not set\n".to_vec(),
            exit_code: 0,
        };
        let mut out = Vec::new();
        let mut err = Vec::new();

        replay(&result, &mut out, &mut err).unwrap();

        assert_eq!(out, result.stdout);
        assert_eq!(err, result.stderr);
    }

    #[test]
    fn test_replay_keeps_non_utf8_output() {
        let result = ExecInfo {
            stdout: vec![0xff, 0xfe, b'o', b'k'],
            stderr: b"Warnung: \xe4\n".to_vec(),
            exit_code: 0,
        };
        let mut out = Vec::new();
        let mut err = Vec::new();

        replay(&result, &mut out, &mut err).unwrap();

        assert_eq!(out, vec![0xff, 0xfe, b'o', b'k']);
        assert_eq!(err, b"Warnung: \xe4\n");
    }

    #[test]
    fn test_verbose_logger_writes_log_file() {
        let temp = TempDir::new().unwrap();
        let logger = build_logger(temp.path(), true);

        javac_cache_core::log_info!(logger, "cache-hit");

        let content = std::fs::read_to_string(temp.path().join(LOG_FILE)).unwrap();
        assert!(content.trim_end().ends_with("cache-hit"));
    }

    #[test]
    fn test_quiet_logger_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let logger = build_logger(temp.path(), false);

        javac_cache_core::log_info!(logger, "cache-hit");

        assert!(!temp.path().join(LOG_FILE).exists());
    }
}
