//! Running the compiler

use crate::metadata::ExecInfo;
use crate::{Error, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::debug;

/// Executes a program and captures what it printed.
///
/// A process that starts and exits non-zero is a normal result; only a
/// failure to launch it is an error.
pub trait Runner: Send + Sync {
    /// Run `program` with `args` to completion
    fn run(&self, program: &Path, args: &[String]) -> Result<ExecInfo>;
}

/// [`Runner`] backed by [`std::process::Command`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<ExecInfo> {
        debug!(program = %program.display(), args = args.len(), "Running process");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Launch {
                program: program.to_path_buf(),
                source,
            })?;

        Ok(ExecInfo {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: exit_code(output.status),
        })
    }
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Confirm that `compiler` identifies itself as `expected_program`.
///
/// Runs the compiler with `probe_arg` and requires the combined output to
/// start with `expected_program`.
pub fn validate_compiler(
    runner: &dyn Runner,
    compiler: &Path,
    probe_arg: &str,
    expected_program: &str,
) -> Result<()> {
    let info = runner.run(compiler, &[probe_arg.to_string()])?;
    let combined = info.combined();
    if combined.starts_with(expected_program) {
        Ok(())
    } else {
        Err(Error::InvalidCompiler {
            path: compiler.to_path_buf(),
            combined_output: combined,
        })
    }
}

/// Write `args` to a temporary argument file, one per line.
///
/// The file is deleted when the returned handle is dropped.
pub fn write_argfile(args: &[String]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("javac-cache-args")
        .tempfile()
        .map_err(|e| Error::io_no_path(e, "create argument file"))?;

    for arg in args {
        writeln!(file, "{}", quote_arg(arg)).map_err(|e| Error::io(e, file.path(), "write"))?;
    }
    file.flush()
        .map_err(|e| Error::io(e, file.path(), "flush"))?;
    Ok(file)
}

/// Quote an argument for a javac `@file` when it would otherwise split or
/// start a `#` comment
fn quote_arg(arg: &str) -> String {
    let needs_quotes = |c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '#');
    if arg.is_empty() || arg.contains(needs_quotes) {
        let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Scripted(ExecInfo);

    impl Runner for Scripted {
        fn run(&self, _program: &Path, _args: &[String]) -> Result<ExecInfo> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_validate_accepts_javac_banner_on_stderr() {
        let runner = Scripted(ExecInfo {
            stdout: Vec::new(),
            stderr: b"javac 1.8.0_202\n".to_vec(),
            exit_code: 0,
        });
        validate_compiler(&runner, Path::new("/jdk/bin/javac"), "-version", "javac").unwrap();
    }

    #[test]
    fn test_validate_rejects_other_programs() {
        let runner = Scripted(ExecInfo {
            stdout: b"Usage: java [options]".to_vec(),
            stderr: Vec::new(),
            exit_code: 1,
        });
        let err = validate_compiler(&runner, Path::new("/jdk/bin/java"), "-version", "javac")
            .unwrap_err();
        match err {
            Error::InvalidCompiler {
                path,
                combined_output,
            } => {
                assert_eq!(path, Path::new("/jdk/bin/java"));
                assert!(combined_output.starts_with("Usage"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_argfile_holds_one_argument_per_line() {
        let args = vec![
            "-d".to_string(),
            "/cache/with space/classes".to_string(),
            "Foo.java".to_string(),
        ];
        let file = write_argfile(&args).unwrap();
        let content = fs::read_to_string(file.path()).unwrap();

        assert_eq!(
            content,
            "-d\n\"/cache/with space/classes\"\nFoo.java\n"
        );
    }

    #[test]
    fn test_argfile_is_removed_on_drop() {
        let file = write_argfile(&["-g".to_string()]).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_quote_arg_escapes_backslashes_inside_quotes() {
        assert_eq!(quote_arg("plain"), "plain");
        assert_eq!(quote_arg(r"C:\a b"), r#""C:\\a b""#);
        assert_eq!(quote_arg(""), "\"\"");
    }

    #[test]
    fn test_quote_arg_protects_hash_from_comment_parsing() {
        assert_eq!(quote_arg("src/C#/Foo.java"), "\"src/C#/Foo.java\"");
        assert_eq!(quote_arg("#Foo.java"), "\"#Foo.java\"");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_reports_nonzero_exit_as_result() {
        let info = ProcessRunner
            .run(
                Path::new("/bin/sh"),
                &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()],
            )
            .unwrap();
        assert_eq!(info.stdout, b"out\n");
        assert_eq!(info.stderr, b"err\n");
        assert_eq!(info.exit_code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_captures_raw_bytes() {
        let info = ProcessRunner
            .run(
                Path::new("/bin/sh"),
                &["-c".to_string(), r"printf '\377\376err'; printf '\344' >&2".to_string()],
            )
            .unwrap();
        assert_eq!(info.stdout, vec![0xff, 0xfe, b'e', b'r', b'r']);
        assert_eq!(info.stderr, vec![0xe4]);
    }

    #[test]
    fn test_process_runner_reports_launch_failure_as_error() {
        let err = ProcessRunner
            .run(Path::new("/definitely/not/a/program"), &[])
            .unwrap_err();
        assert!(matches!(err, Error::Launch { .. }));
    }
}
