//! Core synchronization engine split into focused submodules.
//!
//! The `FastdlSyncer` struct and its methods are organized by concern:
//! - [`indexer`] - Directory-listing fetch and link extraction
//! - [`availability`] - Cross-source aggregation, reconciliation, ranking
//! - [`runner`] - Concurrency-capped task execution
//! - [`fetch`] - Single-file download with atomic publish
//! - [`decompress`] - Streaming bz2 decompression
//! - [`scan`] - Local file-set scanning
//! - [`pipeline`] - Phase orchestration

mod availability;
mod decompress;
mod fetch;
mod indexer;
mod pipeline;
mod runner;
mod scan;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::Result;
use crate::journal::Journal;
use crate::types::{PipelineProgress, RunState, SyncSummary};
use std::sync::Arc;

/// The synchronization engine.
///
/// Owns the configuration, a single HTTP client reused for every request, the
/// run journal, and the progress/cancellation state the display collaborator
/// reads. One instance serves many runs; state is reset at each run entry.
///
/// # Example
///
/// ```no_run
/// use fastdl_sync::{Config, FastdlSyncer, SourceEntry};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config {
///         target_dir: "/games/hl2mp".into(),
///         decompress: true,
///         ..Default::default()
///     };
///     let syncer = FastdlSyncer::new(config)?;
///
///     let mut sources = vec![SourceEntry::new("http://fastdl.example/maps/")];
///     let outcome = syncer.run(&mut sources).await?;
///     println!("{outcome:?}: {:?}", syncer.summary());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FastdlSyncer {
    pub(crate) config: Config,
    pub(crate) client: reqwest::Client,
    pub(crate) journal: Arc<Journal>,
    pub(crate) state: Arc<RunState>,
}

impl FastdlSyncer {
    /// Create a syncer, building the HTTP client it will use for the whole of
    /// its lifetime.
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fastdl-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            client,
            journal: Arc::new(Journal::new()),
            state: Arc::new(RunState::new()),
        })
    }

    /// The configuration this syncer was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the run journal for live display and persistence
    pub fn journal(&self) -> Arc<Journal> {
        Arc::clone(&self.journal)
    }

    /// Snapshots of all four phase counters
    pub fn progress(&self) -> PipelineProgress {
        self.state.progress()
    }

    /// Reconciliation counters from the most recent run or index-only pass
    pub fn summary(&self) -> SyncSummary {
        self.state.summary()
    }

    /// Flip the cancellation switch for the run in flight.
    ///
    /// Cooperative: in-flight work reaches its own abort point, no phase after
    /// the current one starts, and files already published stay in place.
    pub fn cancel(&self) {
        self.state.cancel();
    }
}
