//! Listing indexer
//!
//! One GET per source, timed end to end. The response HTML is scanned for
//! anchor targets that name a map file; everything else in the page is
//! ignored. Every index attempt — successful or not — updates the source's
//! recorded latency and success flag so the next run ranks sources by the most
//! recent observation.

use crate::config::SourceEntry;
use crate::error::{Error, Result};
use crate::types::MAP_EXTENSIONS;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Links extracted from one source during a run, paired with the updated
/// source record the worker owned while indexing it.
#[derive(Debug)]
pub(crate) struct SourceIndex {
    /// Position of the source in the run's source list
    pub(crate) source_id: usize,
    /// The record with fresh latency/success observations
    pub(crate) source: SourceEntry,
    /// Extracted file links, deduplicated, first-seen order
    pub(crate) links: Vec<String>,
}

/// Fetch and scan one source's directory listing.
///
/// Success requires the transport call to complete with a status in 200–399.
/// The source's `last_latency_ms` and `last_ok` are written unconditionally;
/// on failure the link list is empty and the error describes why.
pub(crate) async fn index_source(
    client: &reqwest::Client,
    source: &mut SourceEntry,
    timeout: Duration,
) -> Result<Vec<String>> {
    let started = Instant::now();
    let outcome = fetch_listing(client, &source.url, timeout).await;
    source.last_latency_ms = started.elapsed().as_millis() as i64;
    source.last_ok = outcome.is_ok();

    let body = outcome?;
    Ok(extract_listing_links(&source.url, &body))
}

async fn fetch_listing(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String> {
    let response = client.get(url).timeout(timeout).send().await?;
    let status = response.status().as_u16();
    if !(200..400).contains(&status) {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status,
        });
    }
    Ok(response.text().await?)
}

/// Extract candidate file links from directory-listing HTML.
///
/// A candidate is any anchor `href` whose lowercase form ends in a recognized
/// map extension and does not end in `/` (directory links). Relative targets
/// are joined against the base; absolute `http(s)` targets pass through.
/// First-seen order is preserved and duplicates dropped.
pub(crate) fn extract_listing_links(base_url: &str, html: &str) -> Vec<String> {
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.ends_with('/') {
            continue;
        }

        let lower = href.to_lowercase();
        if !MAP_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
        {
            continue;
        }

        let resolved = join_url(base_url, href);
        if seen.insert(resolved.clone()) {
            out.push(resolved);
        }
    }
    out
}

/// Join a listing link against its base URL, respecting existing separators.
/// Absolute targets pass through unchanged.
pub(crate) fn join_url(base: &str, rel: &str) -> String {
    if rel.starts_with("http://") || rel.starts_with("https://") {
        return rel.to_string();
    }
    if base.is_empty() {
        return rel.to_string();
    }
    match (base.ends_with('/'), rel.starts_with('/')) {
        (true, true) => format!("{base}{}", &rel[1..]),
        (false, false) => format!("{base}/{rel}"),
        _ => format!("{base}{rel}"),
    }
}
