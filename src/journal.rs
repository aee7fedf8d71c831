//! Human-readable run journal
//!
//! Two bounded, append-only line buffers: the live log and a separate failure
//! stream. Both are safe for concurrent append from worker tasks and capped so
//! a long run cannot grow without bound — when a cap is exceeded the oldest
//! block of entries is evicted. At the end of every run the journal is
//! persisted as a timestamped session log regardless of how the run ended.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Live log line cap and the block evicted when it is exceeded
const LOG_CAP: usize = 800;
const LOG_EVICT: usize = 200;

/// Failure line cap and the block evicted when it is exceeded
const FAIL_CAP: usize = 200;
const FAIL_EVICT: usize = 50;

/// Bounded log and failure buffers shared by the pipeline and its workers
#[derive(Debug, Default)]
pub struct Journal {
    lines: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl Journal {
    /// Create an empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line to the live log
    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "fastdl_sync::journal", "{line}");

        #[allow(clippy::unwrap_used)] // mutex poisoning is unrecoverable here
        let mut lines = self.lines.lock().unwrap();
        lines.push(line);
        if lines.len() > LOG_CAP {
            lines.drain(..LOG_EVICT);
        }
    }

    /// Append a line to the failure stream
    pub fn fail(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::warn!(target: "fastdl_sync::journal", "{line}");

        #[allow(clippy::unwrap_used)]
        let mut failures = self.failures.lock().unwrap();
        failures.push(line);
        if failures.len() > FAIL_CAP {
            failures.drain(..FAIL_EVICT);
        }
    }

    /// Copy of the live log, oldest first
    pub fn lines(&self) -> Vec<String> {
        #[allow(clippy::unwrap_used)]
        let lines = self.lines.lock().unwrap();
        lines.clone()
    }

    /// Copy of the failure stream, oldest first
    pub fn failures(&self) -> Vec<String> {
        #[allow(clippy::unwrap_used)]
        let failures = self.failures.lock().unwrap();
        failures.clone()
    }

    /// Persist the journal as `session_YYYYMMDD_HHMMSS.log` under `dir`,
    /// creating the directory if needed. Failures carry their own section.
    pub fn write_session_log(&self, dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("session_{stamp}.log"));
        let mut file = fs::File::create(&path)?;

        for line in self.lines() {
            writeln!(file, "{line}")?;
        }
        let failures = self.failures();
        if !failures.is_empty() {
            writeln!(file, "\n--- FAILURES ---")?;
            for line in failures {
                writeln!(file, "{line}")?;
            }
        }
        Ok(path)
    }
}
