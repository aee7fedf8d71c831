//! Persistence for the source list and settings
//!
//! Both files are plain JSON next to the embedding application. Loading never
//! fails the caller: a missing `sources.json` is created empty, and a file
//! that cannot be parsed degrades to an empty list / default settings with a
//! warning in the journal. Saving reports failures the same way — the data
//! lives on in memory for the rest of the session either way.

use crate::config::{Config, SourceEntry, normalize_source_url};
use crate::journal::Journal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

/// Load the source list, creating an empty `sources.json` on first use.
///
/// URLs are normalized (trailing `/`) and entries with empty URLs dropped.
pub fn load_sources(path: &Path, journal: &Journal) -> Vec<SourceEntry> {
    if !path.exists() {
        let empty = SourcesFile::default();
        match serde_json::to_string_pretty(&empty) {
            Ok(json) => {
                if fs::write(path, json).is_ok() {
                    journal.log(format!("[i] Created {} (empty).", path.display()));
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize empty source list"),
        }
        return Vec::new();
    }

    let parsed = fs::read_to_string(path)
        .map_err(crate::error::Error::from)
        .and_then(|text| Ok(serde_json::from_str::<SourcesFile>(&text)?));

    match parsed {
        Ok(file) => file
            .sources
            .into_iter()
            .filter_map(|mut source| {
                source.url = normalize_source_url(&source.url)?;
                Some(source)
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "unreadable source list");
            journal.fail(format!(
                "[!] Failed to parse {} (will treat as empty).",
                path.display()
            ));
            Vec::new()
        }
    }
}

/// Save the source list, including the latency/success fields updated by the
/// most recent run.
pub fn save_sources(path: &Path, sources: &[SourceEntry], journal: &Journal) {
    let file = SourcesFile {
        sources: sources.to_vec(),
    };
    let result = serde_json::to_string_pretty(&file)
        .map_err(crate::error::Error::from)
        .and_then(|json| Ok(fs::write(path, json)?));

    if let Err(e) = result {
        tracing::warn!(error = %e, path = %path.display(), "failed to write source list");
        journal.fail(format!("[!] Failed to write {}", path.display()));
    }
}

/// Load settings, falling back to defaults for a missing or unparseable file
pub fn load_settings(path: &Path, journal: &Journal) -> Config {
    if !path.exists() {
        return Config::default();
    }

    let parsed = fs::read_to_string(path)
        .map_err(crate::error::Error::from)
        .and_then(|text| Ok(serde_json::from_str::<Config>(&text)?));

    match parsed {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "unreadable settings");
            journal.fail(format!(
                "[!] Failed to parse {} (defaults used).",
                path.display()
            ));
            Config::default()
        }
    }
}

/// Save settings
pub fn save_settings(path: &Path, config: &Config, journal: &Journal) {
    let result = serde_json::to_string_pretty(config)
        .map_err(crate::error::Error::from)
        .and_then(|json| Ok(fs::write(path, json)?));

    if let Err(e) = result {
        tracing::warn!(error = %e, path = %path.display(), "failed to write settings");
        journal.fail(format!("[!] Failed to write {}", path.display()));
    }
}
