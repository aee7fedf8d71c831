//! Pipeline orchestration
//!
//! Four sequential phases — Indexing, Downloading, Decompressing, Deleting —
//! with the synchronous reconciliation step between the first two. Each
//! parallel phase goes through the bounded runner under the one configured
//! concurrency cap. Cancellation is observed at every phase boundary; a
//! cancelled run skips all later phases and reports `Cancelled`. Item
//! failures stay inside their phase and never abort the run. Whatever the
//! outcome, the session log is written before returning.

use crate::config::SourceEntry;
use crate::error::{Error, Result};
use crate::filter::NameFilter;
use crate::types::{ARCHIVE_SUFFIX, RunOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::FastdlSyncer;
use super::availability::{self, AvailabilityMap, Reconciliation};
use super::decompress;
use super::fetch;
use super::indexer::{self, SourceIndex};
use super::runner::run_bounded;
use super::scan;

impl FastdlSyncer {
    /// Run the full pipeline: index, reconcile, download, then optionally
    /// decompress and delete archives.
    ///
    /// `sources` is mutated in place with fresh latency/success observations;
    /// callers persist it after the run. Only run-level preconditions (invalid
    /// target directory, zero enabled sources) return an error — per-item
    /// failures are reported through the journal and the run completes.
    pub async fn run(&self, sources: &mut Vec<SourceEntry>) -> Result<RunOutcome> {
        let cancel = self.state.begin_run();
        let result = self.run_pipeline(sources, &cancel).await;
        self.persist_session_log();
        result
    }

    /// Index and reconcile only: compute the summary counters without
    /// transferring any file data.
    pub async fn index_only(&self, sources: &mut Vec<SourceEntry>) -> Result<RunOutcome> {
        let cancel = self.state.begin_run();
        let result = self.run_index_only(sources, &cancel).await;
        self.persist_session_log();
        result
    }

    async fn run_pipeline(
        &self,
        sources: &mut Vec<SourceEntry>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let target = self.validate_target()?;

        let dl_dir = target.join("download").join("maps");
        if let Err(e) = tokio::fs::create_dir_all(&dl_dir).await {
            self.journal
                .fail(format!("[!] Failed to create {}: {e}", dl_dir.display()));
            return Err(e.into());
        }

        self.scan_local(&target);
        let enabled = self.enabled_sources(sources)?;

        let (ranked, availability, rec) =
            self.index_and_reconcile(sources, enabled, cancel).await;

        self.journal
            .log(format!("[i] Remote unique files: {}", rec.summary.remote_unique));
        self.journal
            .log(format!("[i] After filters: {}", rec.summary.remote_after_filters));
        self.journal
            .log(format!("[i] Already present locally: {}", rec.summary.already_have));
        self.journal
            .log(format!("[i] Unique maps to download: {}", rec.summary.to_download));

        if cancel.is_cancelled() {
            self.journal.log("[i] Cancelled.");
            return Ok(RunOutcome::Cancelled);
        }

        self.download_phase(&ranked, &availability, rec.to_download, &dl_dir, cancel)
            .await;

        if cancel.is_cancelled() {
            self.journal.log("[i] Cancelled.");
            return Ok(RunOutcome::Cancelled);
        }

        if self.config.decompress {
            let archives = list_archives(&dl_dir);
            self.decompress_phase(&archives, cancel).await;

            if self.config.delete_archives && !cancel.is_cancelled() {
                self.delete_phase(archives, cancel).await;
            }
        }

        if cancel.is_cancelled() {
            self.journal.log("[i] Cancelled.");
            return Ok(RunOutcome::Cancelled);
        }

        self.journal.log("[i] Done.");
        Ok(RunOutcome::Completed)
    }

    async fn run_index_only(
        &self,
        sources: &mut Vec<SourceEntry>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let target = self.validate_target()?;
        self.scan_local(&target);
        let enabled = self.enabled_sources(sources)?;

        let (_, _, rec) = self.index_and_reconcile(sources, enabled, cancel).await;

        self.journal.log("[i] Index complete.");
        self.journal
            .log(format!("[i] Remote unique files: {}", rec.summary.remote_unique));
        self.journal
            .log(format!("[i] After filters: {}", rec.summary.remote_after_filters));
        self.journal
            .log(format!("[i] Already present locally: {}", rec.summary.already_have));
        self.journal
            .log(format!("[i] Would download: {}", rec.summary.to_download));

        if cancel.is_cancelled() {
            self.journal.log("[i] Cancelled.");
            return Ok(RunOutcome::Cancelled);
        }
        Ok(RunOutcome::Completed)
    }

    /// Index every enabled source under the concurrency cap, write the updated
    /// records back into `sources`, and reconcile against the local set.
    ///
    /// Each worker owns its source record for the duration of the index call,
    /// so the latency/success mutation needs no lock; only the collected
    /// result list is shared.
    async fn index_and_reconcile(
        &self,
        sources: &mut Vec<SourceEntry>,
        enabled: Vec<(usize, SourceEntry)>,
        cancel: &CancellationToken,
    ) -> (Arc<Vec<SourceEntry>>, Arc<AvailabilityMap>, Reconciliation) {
        self.state.indexing.begin(enabled.len());
        self.journal.log("[i] Indexing sources...");

        let indexed = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let client = self.client.clone();
        let journal = Arc::clone(&self.journal);
        let state = Arc::clone(&self.state);
        let timeout = self.config.index_timeout;

        run_bounded(enabled, self.config.threads, cancel, |(source_id, mut source)| {
            let client = client.clone();
            let journal = Arc::clone(&journal);
            let state = Arc::clone(&state);
            let indexed = Arc::clone(&indexed);
            async move {
                let links = match indexer::index_source(&client, &mut source, timeout).await {
                    Ok(links) => {
                        journal.log(format!(
                            "[+] {} -> {} file(s) ({}ms)",
                            source.url,
                            links.len(),
                            source.last_latency_ms
                        ));
                        links
                    }
                    Err(e) => {
                        journal.fail(format!("[IDX] {} failed ({e})", source.url));
                        Vec::new()
                    }
                };
                indexed.lock().await.push(SourceIndex {
                    source_id,
                    source,
                    links,
                });
                state.indexing.tick();
            }
        })
        .await;
        self.state.indexing.finish();

        let mut indexed = Arc::try_unwrap(indexed)
            .map(|m| m.into_inner())
            .unwrap_or_default();
        // Aggregation follows source input order, not completion order.
        indexed.sort_by_key(|si| si.source_id);

        for si in &indexed {
            if let Some(slot) = sources.get_mut(si.source_id) {
                *slot = si.source.clone();
            }
        }

        let availability = availability::build_availability(&indexed);
        let filter = NameFilter::new(&self.config.include_filters, &self.config.exclude_filters);
        let existing = self.state.existing_snapshot();
        let rec = availability::reconcile(&availability, &filter, &existing);
        self.state.publish_summary(rec.summary);

        (Arc::new(sources.clone()), Arc::new(availability), rec)
    }

    async fn download_phase(
        &self,
        sources: &Arc<Vec<SourceEntry>>,
        availability: &Arc<AvailabilityMap>,
        worklist: Vec<String>,
        dl_dir: &Path,
        cancel: &CancellationToken,
    ) {
        self.state.downloading.begin(worklist.len());

        let client = self.client.clone();
        let journal = Arc::clone(&self.journal);
        let state = Arc::clone(&self.state);
        let timeout = self.config.download_timeout;
        let retries = self.config.retries;
        let dl_dir = dl_dir.to_path_buf();
        let item_cancel = cancel.clone();

        run_bounded(worklist, self.config.threads, cancel, |name: String| {
            let client = client.clone();
            let journal = Arc::clone(&journal);
            let state = Arc::clone(&state);
            let sources = Arc::clone(sources);
            let availability = Arc::clone(availability);
            let dl_dir = dl_dir.clone();
            let cancel = item_cancel.clone();
            async move {
                let offering = availability.get(&name).map(Vec::as_slice).unwrap_or(&[]);
                match availability::pick_best_source(offering, &sources) {
                    None => journal.fail(format!("[DL] No source for: {name}")),
                    Some(id) => {
                        let url = indexer::join_url(&sources[id].url, &name);
                        let dest = dl_dir.join(&name);
                        let _ = fetch::download_file(
                            &client, &url, &dest, timeout, retries, &cancel, &journal,
                        )
                        .await;
                    }
                }
                state.downloading.tick();
            }
        })
        .await;
        self.state.downloading.finish();
    }

    async fn decompress_phase(&self, archives: &[PathBuf], cancel: &CancellationToken) {
        self.journal
            .log(format!("[i] Decompressing .bz2: {}", archives.len()));
        self.state.decompressing.begin(archives.len());

        let journal = Arc::clone(&self.journal);
        let state = Arc::clone(&self.state);
        let retries = self.config.retries;
        let item_cancel = cancel.clone();

        run_bounded(
            archives.to_vec(),
            self.config.threads,
            cancel,
            |archive: PathBuf| {
                let journal = Arc::clone(&journal);
                let state = Arc::clone(&state);
                let cancel = item_cancel.clone();
                async move {
                    let dest = decompress::decompressed_path(&archive);
                    let _ =
                        decompress::decompress_archive(&archive, &dest, retries, &cancel, &journal)
                            .await;
                    state.decompressing.tick();
                }
            },
        )
        .await;
        self.state.decompressing.finish();
    }

    async fn delete_phase(&self, archives: Vec<PathBuf>, cancel: &CancellationToken) {
        self.journal.log("[i] Deleting .bz2 files...");
        self.state.deleting.begin(archives.len());

        let journal = Arc::clone(&self.journal);
        let state = Arc::clone(&self.state);

        run_bounded(archives, self.config.threads, cancel, |archive: PathBuf| {
            let journal = Arc::clone(&journal);
            let state = Arc::clone(&state);
            async move {
                if let Err(e) = tokio::fs::remove_file(&archive).await {
                    let name = archive
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| archive.display().to_string());
                    journal.fail(format!("[DEL] {name} -> {e}"));
                }
                state.deleting.tick();
            }
        })
        .await;
        self.state.deleting.finish();
    }

    fn validate_target(&self) -> Result<PathBuf> {
        let target = self.config.target_dir.clone();
        if target.as_os_str().is_empty() || !target.exists() {
            self.journal.fail("[!] Target directory invalid.");
            return Err(Error::config(
                "target directory missing or does not exist",
                "target_dir",
            ));
        }
        Ok(target)
    }

    fn enabled_sources(&self, sources: &[SourceEntry]) -> Result<Vec<(usize, SourceEntry)>> {
        let enabled: Vec<(usize, SourceEntry)> = sources
            .iter()
            .enumerate()
            .filter(|(_, s)| s.enabled)
            .map(|(i, s)| (i, s.clone()))
            .collect();

        if enabled.is_empty() {
            self.journal.fail("[!] No enabled sources.");
            return Err(Error::config("no enabled sources", "sources"));
        }
        Ok(enabled)
    }

    fn scan_local(&self, target: &Path) {
        let existing = scan::scan_existing_files(target);
        self.journal
            .log(format!("[i] Existing map files found: {}", existing.len()));
        self.state.set_existing(existing);
    }

    fn persist_session_log(&self) {
        if let Err(e) = self.journal.write_session_log(&self.config.log_dir) {
            tracing::warn!(error = %e, "failed to write session log");
        }
    }
}

/// Archives in the download directory, non-recursive, sorted by name
fn list_archives(dl_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dl_dir) else {
        return Vec::new();
    };

    let mut archives: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_lowercase().ends_with(ARCHIVE_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    archives.sort();
    archives
}
