use crate::tracing::TracingFormat;
use clap::Parser;
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Command line or compiler configuration error exit code
pub const EXIT_CLI: i32 = 1;
/// Cache or internal error exit code
pub const EXIT_CACHE: i32 = 2;

/// CLI-specific error types with exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Command line or compiler configuration error (exit code 1)
    #[error("{message}")]
    #[diagnostic(code(javac_cache::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Failure inside the cache (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(javac_cache::cli::cache))]
    Cache {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new cache error
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new cache error with help text
    #[must_use]
    pub fn cache_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert `javac_cache_core::Error` to the matching `CliError` variant.
///
/// Problems with the command line itself (no compiler, missing compiler,
/// unreadable `@file`) are configuration errors. Everything raised while the
/// cache was working is a cache error.
impl From<javac_cache_core::Error> for CliError {
    fn from(err: javac_cache_core::Error) -> Self {
        use javac_cache_core::Error;

        match err {
            Error::Configuration { message } => Self::config(message),
            Error::CompilerNotFound { .. } => {
                Self::config_with_help(err.to_string(), "Pass the path of a javac executable")
            }
            Error::ArgFile { .. } => {
                Self::config_with_help(err.to_string(), "Check that the @file exists and is readable")
            }
            Error::InvalidCompiler {
                ref combined_output,
                ..
            } => Self::config_with_help(
                err.to_string(),
                format!("The compiler answered -version with:\n{combined_output}"),
            ),
            Error::Io { .. } => Self::cache_with_help(
                err.to_string(),
                "Check permissions on the cache directory or clear it with --clear",
            ),
            Error::Launch { ref source, .. } => {
                Self::cache_with_help(err.to_string(), source.to_string())
            }
            Error::Serialization { .. }
            | Error::NotRegular { .. }
            | Error::PartialCopy { .. } => Self::cache(err.to_string()),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Cache { .. } => EXIT_CACHE,
    }
}

/// Print `err` to stderr with miette's reporter
#[allow(clippy::print_stderr)]
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}

/// Transparent cache in front of javac.
///
/// Runs `COMPILER ARGS...` through the cache: identical invocations over
/// unchanged sources replay the recorded output and copy the recorded class
/// files instead of compiling again.
#[derive(Parser, Debug)]
#[command(name = "javac-cache", version)]
#[command(about = "Transparent result cache for javac invocations")]
#[command(long_about = None)]
pub struct Cli {
    /// Directory holding cache entries.
    #[arg(long, env = "JAVAC_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Record cache decisions in <DIR>/log.txt and on stderr.
    #[arg(short, long, env = "JAVAC_CACHE_VERBOSE")]
    pub verbose: bool,

    /// Remove every cache entry before running.
    #[arg(short, long)]
    pub clear: bool,

    /// Format of diagnostic output on stderr.
    #[arg(long, value_enum, default_value_t = TracingFormat::Compact)]
    pub log_format: TracingFormat,

    /// Compiler executable followed by its arguments, passed through verbatim.
    #[arg(
        value_name = "COMPILER",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub compiler_command: Vec<String>,
}

/// Parse command line arguments into a CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
