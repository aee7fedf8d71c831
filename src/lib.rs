//! # fastdl-sync
//!
//! Backend library for keeping a local map collection in sync with a set of
//! FastDL HTTP mirrors.
//!
//! ## Design Philosophy
//!
//! fastdl-sync is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Cooperative** - One cancellation switch stops the pipeline at the next
//!   safe point; published files are never rolled back
//! - **Observable** - Per-phase progress counters and a bounded journal are
//!   readable at any moment during a run
//!
//! A run indexes every enabled mirror's directory listing concurrently,
//! reconciles the aggregate against the local file set, downloads each missing
//! file from the lowest-latency mirror that offers it, and optionally
//! decompresses the fetched `.bz2` archives.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fastdl_sync::{Config, FastdlSyncer, SourceEntry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         target_dir: "/games/hl2mp".into(),
//!         decompress: true,
//!         delete_archives: true,
//!         ..Default::default()
//!     };
//!
//!     let syncer = FastdlSyncer::new(config)?;
//!     let mut sources = vec![
//!         SourceEntry::new("http://fastdl-a.example/maps/"),
//!         SourceEntry::new("http://fastdl-b.example/maps/"),
//!     ];
//!
//!     let outcome = syncer.run(&mut sources).await?;
//!     println!("{outcome:?}: {:?}", syncer.summary());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Steam install auto-detection
pub mod detect;
/// Error types
pub mod error;
/// Include/exclude filename filtering
pub mod filter;
/// Bounded run journal and session-log persistence
pub mod journal;
/// Constant-delay retry logic
pub(crate) mod retry;
/// sources.json / settings.json persistence
pub mod store;
/// Core synchronization pipeline (decomposed into focused submodules)
pub mod sync;
/// Core types and progress snapshots
pub mod types;

// Re-export commonly used types
pub use config::{Config, SourceEntry, normalize_source_url};
pub use error::{Error, Result};
pub use filter::NameFilter;
pub use journal::Journal;
pub use sync::FastdlSyncer;
pub use types::{PhaseSnapshot, PipelineProgress, RunOutcome, SyncSummary};
