//! Configuration types for fastdl-sync

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A mirror offering an HTTP directory listing of map archives.
///
/// The URL is normalized to end with `/` so filenames can be appended
/// directly. `last_latency_ms` and `last_ok` are observations from the most
/// recent index attempt; they persist across runs via `sources.json` and feed
/// best-source selection on the next run. `-1` means the source has never been
/// timed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Directory-listing URL, normalized to end with `/`
    pub url: String,

    /// Whether this source participates in runs
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Round-trip latency observed by the most recent index attempt, in
    /// milliseconds (-1 = never timed)
    #[serde(default = "default_latency")]
    pub last_latency_ms: i64,

    /// Whether the most recent index attempt succeeded
    #[serde(default)]
    pub last_ok: bool,
}

impl SourceEntry {
    /// Create a new enabled source with no recorded observations
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            enabled: true,
            last_latency_ms: -1,
            last_ok: false,
        }
    }
}

/// Main configuration for [`FastdlSyncer`](crate::FastdlSyncer)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Game content directory containing `maps/` (downloads land in
    /// `download/maps/` underneath it)
    #[serde(default)]
    pub target_dir: PathBuf,

    /// Concurrency cap shared by every pipeline phase (minimum 1)
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Decompress fetched `.bz2` archives after the download phase
    #[serde(default)]
    pub decompress: bool,

    /// Delete `.bz2` archives once decompression has run
    #[serde(default)]
    pub delete_archives: bool,

    /// Timeout for one directory-listing GET (default: 8 seconds)
    #[serde(
        rename = "index_timeout_ms",
        default = "default_index_timeout",
        with = "duration_ms_serde"
    )]
    pub index_timeout: Duration,

    /// Timeout for one file download (default: 30 seconds)
    #[serde(
        rename = "download_timeout_ms",
        default = "default_download_timeout",
        with = "duration_ms_serde"
    )]
    pub download_timeout: Duration,

    /// Attempts per download/decompression before the item is abandoned
    /// (default: 3)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Comma-separated case-insensitive substrings a filename must contain
    /// (empty = no include filtering)
    #[serde(default)]
    pub include_filters: String,

    /// Comma-separated case-insensitive substrings that disqualify a filename
    #[serde(default)]
    pub exclude_filters: String,

    /// Directory that receives per-run session logs (default: `./logs`)
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::new(),
            threads: default_threads(),
            decompress: false,
            delete_archives: false,
            index_timeout: default_index_timeout(),
            download_timeout: default_download_timeout(),
            retries: default_retries(),
            include_filters: String::new(),
            exclude_filters: String::new(),
            log_dir: default_log_dir(),
        }
    }
}

/// Normalize a source URL: trim whitespace and guarantee a trailing `/`.
///
/// Returns `None` for an empty (or all-whitespace) input so callers can drop
/// the entry instead of persisting a useless record.
pub fn normalize_source_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut out = trimmed.to_string();
    if !out.ends_with('/') {
        out.push('/');
    }
    Some(out)
}

fn default_true() -> bool {
    true
}

fn default_latency() -> i64 {
    -1
}

/// Half the available hardware parallelism, never below 1
pub(crate) fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(4)
}

fn default_index_timeout() -> Duration {
    Duration::from_millis(8000)
}

fn default_download_timeout() -> Duration {
    Duration::from_millis(30_000)
}

fn default_retries() -> u32 {
    3
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

// Durations round-trip as millisecond integers so the on-disk settings format
// matches the *_ms field names.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_appends_trailing_slash() {
        assert_eq!(
            normalize_source_url("http://mirror.example/maps"),
            Some("http://mirror.example/maps/".to_string())
        );
    }

    #[test]
    fn normalize_keeps_existing_slash() {
        assert_eq!(
            normalize_source_url("http://mirror.example/maps/"),
            Some("http://mirror.example/maps/".to_string())
        );
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(
            normalize_source_url("  http://mirror.example/maps/  "),
            Some("http://mirror.example/maps/".to_string())
        );
    }

    #[test]
    fn normalize_rejects_empty() {
        assert_eq!(normalize_source_url(""), None);
        assert_eq!(normalize_source_url("   "), None);
    }

    #[test]
    fn config_defaults_are_sane() {
        let config = Config::default();
        assert!(config.threads >= 1);
        assert_eq!(config.index_timeout, Duration::from_secs(8));
        assert_eq!(config.download_timeout, Duration::from_secs(30));
        assert_eq!(config.retries, 3);
        assert!(!config.decompress);
        assert!(!config.delete_archives);
    }

    #[test]
    fn config_round_trips_durations_as_millis() {
        let config = Config {
            index_timeout: Duration::from_millis(1234),
            ..Default::default()
        };

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["index_timeout_ms"], 1234);

        let back: Config = serde_json::from_value(json).unwrap();
        assert_eq!(back.index_timeout, Duration::from_millis(1234));
    }

    #[test]
    fn config_deserializes_from_empty_object() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.retries, 3);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn source_entry_defaults_on_sparse_json() {
        let source: SourceEntry =
            serde_json::from_str(r#"{"url": "http://mirror.example/maps/"}"#).unwrap();
        assert!(source.enabled);
        assert_eq!(source.last_latency_ms, -1);
        assert!(!source.last_ok);
    }
}
