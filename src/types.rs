//! Core types for fastdl-sync

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// File extensions the pipeline recognizes, both in directory listings and in
/// the local scan (lowercase, without the leading dot).
pub(crate) const MAP_EXTENSIONS: [&str; 2] = ["bsp", "bz2"];

/// Suffix identifying a compressed archive that the decompression phase handles
pub(crate) const ARCHIVE_SUFFIX: &str = ".bz2";

/// Terminal state of a pipeline run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every phase ran to its end (individual items may still have failed)
    Completed,
    /// The cancellation switch stopped the run at a phase boundary
    Cancelled,
}

/// Point-in-time view of one phase's progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    /// Whether the phase currently has work in flight
    pub running: bool,
    /// Units of work finished or abandoned so far
    pub done: usize,
    /// Units of work the phase was started with
    pub total: usize,
}

impl PhaseSnapshot {
    /// Completion ratio clamped to `0.0..=1.0`; `0.0` while total is unset
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.done as f32 / self.total as f32).clamp(0.0, 1.0)
    }
}

/// Snapshots of all four phases, for live display
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    /// Indexing phase
    pub indexing: PhaseSnapshot,
    /// Downloading phase
    pub downloading: PhaseSnapshot,
    /// Decompressing phase
    pub decompressing: PhaseSnapshot,
    /// Deleting phase
    pub deleting: PhaseSnapshot,
}

/// Reconciliation counters from the most recent run or index-only pass.
///
/// `already_have + to_download == remote_after_filters` always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Distinct filenames seen across all successfully indexed sources
    pub remote_unique: usize,
    /// Of those, how many pass the include/exclude filters
    pub remote_after_filters: usize,
    /// Filtered filenames already present in the local file set
    pub already_have: usize,
    /// Filtered filenames the download phase would fetch
    pub to_download: usize,
}

/// Live progress cell for one phase.
///
/// `done` is monotonically non-decreasing within a phase and only reset by
/// [`reset`](PhaseProgress::reset) at the start of the next run. `running`
/// clears only once every unit of work has finished or been abandoned.
#[derive(Debug, Default)]
pub(crate) struct PhaseProgress {
    running: AtomicBool,
    done: AtomicUsize,
    total: AtomicUsize,
}

impl PhaseProgress {
    /// Clear all counters; called for every phase at run entry so stale values
    /// never leak into the display
    pub(crate) fn reset(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
    }

    /// Mark the phase running with `total` units of work ahead
    pub(crate) fn begin(&self, total: usize) {
        self.done.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    /// Count one unit of work as finished or abandoned
    pub(crate) fn tick(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    /// Clear the running flag once the phase's runner has returned
    pub(crate) fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            running: self.running.load(Ordering::SeqCst),
            done: self.done.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
        }
    }
}

/// Shared state for one orchestrator invocation, retained between runs so the
/// display can keep showing the last summary.
#[derive(Debug)]
pub(crate) struct RunState {
    /// Replaced with a fresh token at every run entry; cancelling the current
    /// token is the single writable cancellation switch
    cancel: Mutex<CancellationToken>,
    /// Bare filenames present under the scan roots, rebuilt at run entry
    pub(crate) existing: Mutex<HashSet<String>>,
    pub(crate) indexing: PhaseProgress,
    pub(crate) downloading: PhaseProgress,
    pub(crate) decompressing: PhaseProgress,
    pub(crate) deleting: PhaseProgress,
    summary: Mutex<SyncSummary>,
}

impl RunState {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Mutex::new(CancellationToken::new()),
            existing: Mutex::new(HashSet::new()),
            indexing: PhaseProgress::default(),
            downloading: PhaseProgress::default(),
            decompressing: PhaseProgress::default(),
            deleting: PhaseProgress::default(),
            summary: Mutex::new(SyncSummary::default()),
        }
    }

    /// Reset every phase and install a fresh cancellation token, returning it
    /// for the run about to start.
    pub(crate) fn begin_run(&self) -> CancellationToken {
        self.indexing.reset();
        self.downloading.reset();
        self.decompressing.reset();
        self.deleting.reset();

        let token = CancellationToken::new();
        #[allow(clippy::unwrap_used)] // mutex poisoning is unrecoverable here
        let mut guard = self.cancel.lock().unwrap();
        *guard = token.clone();
        token
    }

    /// Flip the cancellation switch for the run currently in flight (or arm it
    /// for a run that has not started; `begin_run` replaces the token).
    pub(crate) fn cancel(&self) {
        #[allow(clippy::unwrap_used)]
        self.cancel.lock().unwrap().cancel();
    }

    /// Replace the local file set with the result of this run's scan
    pub(crate) fn set_existing(&self, files: HashSet<String>) {
        #[allow(clippy::unwrap_used)]
        let mut guard = self.existing.lock().unwrap();
        *guard = files;
    }

    /// Copy of the local file set as of the last scan
    pub(crate) fn existing_snapshot(&self) -> HashSet<String> {
        #[allow(clippy::unwrap_used)]
        let guard = self.existing.lock().unwrap();
        guard.clone()
    }

    pub(crate) fn publish_summary(&self, summary: SyncSummary) {
        #[allow(clippy::unwrap_used)]
        let mut guard = self.summary.lock().unwrap();
        *guard = summary;
    }

    pub(crate) fn summary(&self) -> SyncSummary {
        #[allow(clippy::unwrap_used)]
        let guard = self.summary.lock().unwrap();
        *guard
    }

    pub(crate) fn progress(&self) -> PipelineProgress {
        PipelineProgress {
            indexing: self.indexing.snapshot(),
            downloading: self.downloading.snapshot(),
            decompressing: self.decompressing.snapshot(),
            deleting: self.deleting.snapshot(),
        }
    }
}
