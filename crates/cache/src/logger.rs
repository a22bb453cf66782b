//! Decision log for the cache engine
//!
//! The engine reports what it decided (hit, miss, timings, bytes served)
//! through an injected [`Logger`]. Implementations:
//! - [`NullLogger`]: discards everything
//! - [`TracingLogger`]: forwards to `tracing` at INFO
//! - [`FileLogger`]: appends timestamped lines to a file
//! - [`LoggerChain`]: fans out to several loggers

use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Sink for formatted log lines.
///
/// Called concurrently from both replication tasks, so implementations must
/// serialize access to any shared writer.
pub trait Logger: Send + Sync {
    /// Record one message
    fn info(&self, message: fmt::Arguments<'_>);
}

/// Log through a [`Logger`] with `format!` syntax
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logger::Logger::info(&*$logger, format_args!($($arg)+))
    };
}

/// Logger that drops every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn info(&self, _message: fmt::Arguments<'_>) {}
}

/// Logger that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: fmt::Arguments<'_>) {
        tracing::info!(target: "javac_cache", "{message}");
    }
}

/// Logger appending `[timestamp][session] message` lines to a file
#[derive(Debug)]
pub struct FileLogger {
    session: Uuid,
    out: Mutex<File>,
}

impl FileLogger {
    /// Open `path` for appending, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create_dir_all"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(e, path, "open"))?;
        Ok(Self {
            session: Uuid::new_v4(),
            out: Mutex::new(file),
        })
    }

    /// Identifier written on every line of this logger
    #[must_use]
    pub fn session(&self) -> Uuid {
        self.session
    }
}

impl Logger for FileLogger {
    fn info(&self, message: fmt::Arguments<'_>) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let text = message.to_string();
        let mut buf = String::with_capacity(text.len() + 64);
        for (i, line) in text.trim_end().lines().enumerate() {
            if i == 0 {
                buf.push_str(&format!("[{now}][{}] {line}\n", self.session));
            } else {
                buf.push_str(&format!("    {line}\n"));
            }
        }
        if buf.is_empty() {
            return;
        }

        // A poisoned lock only means another writer panicked mid-line.
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = out.write_all(buf.as_bytes()) {
            tracing::warn!("Failed to write cache log: {e}");
        }
    }
}

/// Logger forwarding every message to each inner logger in order
#[derive(Clone, Default)]
pub struct LoggerChain {
    loggers: Vec<Arc<dyn Logger>>,
}

impl LoggerChain {
    /// Chain the given loggers
    #[must_use]
    pub fn new(loggers: Vec<Arc<dyn Logger>>) -> Self {
        Self { loggers }
    }

    /// Number of chained loggers
    #[must_use]
    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    /// `true` if nothing is chained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl Logger for LoggerChain {
    fn info(&self, message: fmt::Arguments<'_>) {
        for logger in &self.loggers {
            logger.info(message);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Logger collecting messages in memory
    #[derive(Default)]
    pub(crate) struct MemoryLogger {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl Logger for MemoryLogger {
        fn info(&self, message: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_null_logger_is_inert() {
        let logger = NullLogger;
        log_info!(&logger, "ignored {}", 42);
    }

    #[test]
    fn test_file_logger_appends_tagged_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs/log.txt");

        let logger = FileLogger::open(&path).unwrap();
        log_info!(&logger, "cache-miss");
        log_info!(&logger, "served {} bytes\nfrom {} files\n", 10, 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let session = logger.session().to_string();
        assert!(lines[0].contains(&session));
        assert!(lines[0].ends_with("cache-miss"));
        assert!(lines[1].ends_with("served 10 bytes"));
        assert_eq!(lines[2], "    from 2 files");
    }

    #[test]
    fn test_file_logger_keeps_existing_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("log.txt");
        fs::write(&path, "earlier\n").unwrap();

        let logger = FileLogger::open(&path).unwrap();
        log_info!(&logger, "later");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier\n"));
        assert!(content.trim_end().ends_with("later"));
    }

    #[test]
    fn test_chain_fans_out_to_every_logger() {
        let first = Arc::new(MemoryLogger::default());
        let second = Arc::new(MemoryLogger::default());
        let chain = LoggerChain::new(vec![
            first.clone() as Arc<dyn Logger>,
            second.clone() as Arc<dyn Logger>,
            Arc::new(NullLogger) as Arc<dyn Logger>,
        ]);

        log_info!(&chain, "cache-hit");

        assert_eq!(chain.len(), 3);
        assert_eq!(*first.lines.lock().unwrap(), vec!["cache-hit".to_string()]);
        assert_eq!(*second.lines.lock().unwrap(), vec!["cache-hit".to_string()]);
    }

    #[test]
    fn test_file_logger_serializes_concurrent_writers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("log.txt");
        let logger = Arc::new(FileLogger::open(&path).unwrap());

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let logger = Arc::clone(&logger);
                scope.spawn(move || {
                    for i in 0..25 {
                        log_info!(logger, "worker {worker} line {i}");
                    }
                });
            }
        });

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 100);
        assert!(content.lines().all(|l| l.contains("] worker ")));
    }
}
