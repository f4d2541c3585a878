//! Service log streams.
//!
//! # Responsibilities
//! - Maintain the three plain-text service logs: `resolve.log`, `fail.log`
//!   and `gc.log`
//! - Prefix every line with a UTC timestamp
//! - Reopen all files on demand (SIGUSR2, after external rotation)
//!
//! # Design Decisions
//! - Separate from `tracing` diagnostics: these files are the service's
//!   queryable record of decisions, not debug output
//! - Write errors are reported once via `tracing` and otherwise swallowed;
//!   a broken log file must not fail requests

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

/// One reopenable, timestamped log file.
///
/// Cheap to clone; all clones share the underlying file handle.
#[derive(Clone)]
pub struct LogStream {
    inner: Arc<Mutex<Option<File>>>,
    path: Option<PathBuf>,
}

impl LogStream {
    /// A stream that discards everything (no log directory configured).
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            path: None,
        }
    }

    /// Open (or create) the file in append mode.
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        let file = open_append(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Some(file))),
            path: Some(path),
        })
    }

    /// Write one line, prefixed with the current UTC time.
    pub fn log(&self, message: &str) {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(file) = guard.as_mut() else { return };
        let line = format!("{} {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"), message);
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::error!(path = ?self.path, error = %e, "service log write failed");
        }
    }

    /// Close and reopen the underlying file.
    pub fn reopen(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let file = open_append(path)?;
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(file);
        Ok(())
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// The service's three log streams.
#[derive(Clone)]
pub struct LogSet {
    pub resolve: LogStream,
    pub fail: LogStream,
    pub gc: LogStream,
}

impl LogSet {
    /// Open all streams under `dir`, or run with logging disabled.
    pub fn open(dir: Option<&Path>) -> std::io::Result<Self> {
        match dir {
            Some(dir) => Ok(Self {
                resolve: LogStream::open(dir.join("resolve.log"))?,
                fail: LogStream::open(dir.join("fail.log"))?,
                gc: LogStream::open(dir.join("gc.log"))?,
            }),
            None => Ok(Self::disabled()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            resolve: LogStream::disabled(),
            fail: LogStream::disabled(),
            gc: LogStream::disabled(),
        }
    }

    /// Reopen every stream, for external log rotation.
    pub fn reopen_all(&self) -> std::io::Result<()> {
        self.resolve.reopen()?;
        self.fail.reopen()?;
        self.gc.reopen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_log_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolve.log");
        let stream = LogStream::open(path.clone()).unwrap();
        stream.log("R: https://a/x meta");

        let content = fs::read_to_string(&path).unwrap();
        let line = content.lines().next().unwrap();
        // "YYYY-MM-DD HH:MM:SS " prefix, then the message.
        assert_eq!(&line[4..5], "-");
        assert!(line.ends_with("R: https://a/x meta"));
        assert_eq!(line.len(), 19 + 1 + "R: https://a/x meta".len());
    }

    #[test]
    fn test_reopen_after_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fail.log");
        let stream = LogStream::open(path.clone()).unwrap();
        stream.log("first");

        fs::remove_file(&path).unwrap();
        stream.reopen().unwrap();
        stream.log("second");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("second"));
        assert!(!content.contains("first"));
    }

    #[test]
    fn test_disabled_stream_drops() {
        let stream = LogStream::disabled();
        stream.log("goes nowhere");
        stream.reopen().unwrap();
    }
}
