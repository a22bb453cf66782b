//! Locating the cache base directory

use crate::cli::CliError;
use dirs::{cache_dir, home_dir};
use std::path::PathBuf;

/// Name of the cache directory under the standard cache locations
pub const APP_DIR: &str = "javac-cache";

/// Everything the resolution reads from the environment
#[derive(Debug, Clone, Default)]
pub struct CacheDirInputs {
    /// `--cache-dir` / `JAVAC_CACHE_DIR`
    pub override_dir: Option<PathBuf>,
    /// `XDG_CACHE_HOME`
    pub xdg_cache_home: Option<PathBuf>,
    /// Platform cache directory
    pub os_cache_dir: Option<PathBuf>,
    /// User home directory
    pub home_dir: Option<PathBuf>,
    /// System temporary directory
    pub temp_dir: PathBuf,
}

impl CacheDirInputs {
    /// Inputs taken from the process environment
    #[must_use]
    pub fn from_env(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir,
            xdg_cache_home: std::env::var("XDG_CACHE_HOME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            os_cache_dir: cache_dir(),
            home_dir: home_dir(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// Pick the base directory for cache entries.
///
/// Candidates in order (first writable wins):
/// 1) the explicit override
/// 2) `XDG_CACHE_HOME/javac-cache`
/// 3) OS cache dir/javac-cache
/// 4) `~/.javac-cache`
/// 5) `TMPDIR/javac-cache`
pub fn resolve(inputs: CacheDirInputs) -> Result<PathBuf, CliError> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = inputs.override_dir.filter(|p| !p.as_os_str().is_empty()) {
        candidates.push(dir);
    }
    if let Some(xdg) = inputs.xdg_cache_home {
        candidates.push(xdg.join(APP_DIR));
    }
    if let Some(os_cache) = inputs.os_cache_dir {
        candidates.push(os_cache.join(APP_DIR));
    }
    if let Some(home) = inputs.home_dir {
        candidates.push(home.join(format!(".{APP_DIR}")));
    }
    candidates.push(inputs.temp_dir.join(APP_DIR));

    for path in candidates {
        // Nix builds point HOME here and it is never writable
        if path.starts_with("/homeless-shelter") {
            continue;
        }
        if is_writable_dir(&path) {
            return Ok(path);
        }
        tracing::debug!(candidate = %path.display(), "Cache directory candidate not writable");
    }

    Err(CliError::config_with_help(
        "Failed to determine a writable cache directory",
        "Set JAVAC_CACHE_DIR or pass --cache-dir",
    ))
}

fn is_writable_dir(path: &std::path::Path) -> bool {
    if std::fs::create_dir_all(path).is_err() {
        return false;
    }
    let probe = path.join(".write_probe");
    match std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&probe)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
