//! Availability aggregation and best-source selection
//!
//! After indexing, the per-source link lists are merged into one map from bare
//! filename to the sources offering it. The map is rebuilt from scratch every
//! run; only enabled sources whose index attempt succeeded contribute.
//! Ranking happens later, per file, at download time — aggregation order is
//! source input order, not latency order.

use crate::config::SourceEntry;
use crate::filter::NameFilter;
use crate::types::SyncSummary;
use std::collections::{BTreeMap, HashSet};

use super::indexer::SourceIndex;

/// Filename → ids of the sources offering it, for one run
pub(crate) type AvailabilityMap = BTreeMap<String, Vec<usize>>;

/// Bare filename of a listing link (everything after the last `/`)
pub(crate) fn link_filename(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

/// Merge index results into the availability map.
///
/// `indexed` is expected in source input order; per-filename source sets keep
/// that order so tie-breaks at selection time favor earlier sources.
pub(crate) fn build_availability(indexed: &[SourceIndex]) -> AvailabilityMap {
    let mut availability = AvailabilityMap::new();
    for si in indexed {
        if !si.source.enabled || !si.source.last_ok {
            continue;
        }
        for link in &si.links {
            let name = link_filename(link).to_string();
            availability.entry(name).or_default().push(si.source_id);
        }
    }
    availability
}

/// Outcome of comparing remote availability against the local file set
#[derive(Debug, Default)]
pub(crate) struct Reconciliation {
    pub(crate) summary: SyncSummary,
    /// Bare filenames the download phase should fetch
    pub(crate) to_download: Vec<String>,
}

/// Count filtered filenames against the local set and build the download
/// worklist.
pub(crate) fn reconcile(
    availability: &AvailabilityMap,
    filter: &NameFilter,
    existing: &HashSet<String>,
) -> Reconciliation {
    let mut rec = Reconciliation::default();
    rec.summary.remote_unique = availability.len();

    for name in availability.keys() {
        if !filter.matches(name) {
            continue;
        }
        rec.summary.remote_after_filters += 1;

        if existing.contains(name) {
            rec.summary.already_have += 1;
        } else {
            rec.summary.to_download += 1;
            rec.to_download.push(name.clone());
        }
    }
    rec
}

/// Pick the offering source with the lowest last-observed latency.
///
/// Unknown latency (-1) ranks below any timed observation. The first source
/// in the set wins ties. `None` only for an empty set, which callers report
/// as a failed item without aborting the run.
pub(crate) fn pick_best_source(offering: &[usize], sources: &[SourceEntry]) -> Option<usize> {
    fn effective_latency(source: &SourceEntry) -> i64 {
        if source.last_latency_ms >= 0 {
            source.last_latency_ms
        } else {
            i64::MAX
        }
    }

    let mut best: Option<usize> = None;
    for &id in offering {
        let Some(candidate) = sources.get(id) else {
            continue;
        };
        match best {
            None => best = Some(id),
            Some(current) => {
                if effective_latency(candidate) < effective_latency(&sources[current]) {
                    best = Some(id);
                }
            }
        }
    }
    best
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, latency: i64, ok: bool) -> SourceEntry {
        SourceEntry {
            url: url.to_string(),
            enabled: true,
            last_latency_ms: latency,
            last_ok: ok,
        }
    }

    fn index(source_id: usize, source: SourceEntry, links: &[&str]) -> SourceIndex {
        SourceIndex {
            source_id,
            source,
            links: links.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn filename_appearing_in_k_results_has_k_distinct_members() {
        let indexed = vec![
            index(
                0,
                source("http://a.example/maps/", 30, true),
                &["http://a.example/maps/dm_lockdown.bsp.bz2"],
            ),
            index(
                1,
                source("http://b.example/maps/", 200, true),
                &[
                    "http://b.example/maps/dm_lockdown.bsp.bz2",
                    "http://b.example/maps/ctf_turbine.bsp",
                ],
            ),
            index(
                2,
                source("http://c.example/maps/", 90, true),
                &["http://c.example/maps/dm_lockdown.bsp.bz2"],
            ),
        ];

        let availability = build_availability(&indexed);
        assert_eq!(availability["dm_lockdown.bsp.bz2"], vec![0, 1, 2]);
        assert_eq!(availability["ctf_turbine.bsp"], vec![1]);
    }

    #[test]
    fn failed_or_disabled_sources_never_contribute() {
        let mut disabled = source("http://a.example/maps/", 10, true);
        disabled.enabled = false;

        let indexed = vec![
            index(0, disabled, &["http://a.example/maps/dm_lockdown.bsp.bz2"]),
            index(
                1,
                source("http://b.example/maps/", 20, false),
                &["http://b.example/maps/dm_lockdown.bsp.bz2"],
            ),
        ];

        assert!(build_availability(&indexed).is_empty());
    }

    #[test]
    fn reconcile_counts_satisfy_the_invariant() {
        let indexed = vec![index(
            0,
            source("http://a.example/maps/", 30, true),
            &[
                "http://a.example/maps/dm_lockdown.bsp.bz2",
                "http://a.example/maps/dm_overwatch.bsp.bz2",
                "http://a.example/maps/ctf_turbine.bsp.bz2",
                "http://a.example/maps/secret_admin.bsp",
            ],
        )];
        let availability = build_availability(&indexed);

        let filter = NameFilter::new("", "secret");
        let existing: HashSet<String> = ["dm_lockdown.bsp.bz2".to_string()].into();

        let rec = reconcile(&availability, &filter, &existing);
        assert_eq!(rec.summary.remote_unique, 4);
        assert_eq!(rec.summary.remote_after_filters, 3);
        assert_eq!(rec.summary.already_have, 1);
        assert_eq!(rec.summary.to_download, 2);
        assert_eq!(
            rec.summary.already_have + rec.summary.to_download,
            rec.summary.remote_after_filters
        );
        assert_eq!(
            rec.to_download,
            vec!["ctf_turbine.bsp.bz2", "dm_overwatch.bsp.bz2"]
        );
    }

    #[test]
    fn ranker_prefers_lowest_latency_and_timed_over_unknown() {
        let sources = vec![
            source("http://unknown.example/", -1, true),
            source("http://slow.example/", 100, true),
            source("http://fast.example/", 50, true),
        ];

        assert_eq!(pick_best_source(&[0, 1, 2], &sources), Some(2));
        assert_eq!(pick_best_source(&[0, 1], &sources), Some(1));
        assert_eq!(pick_best_source(&[0], &sources), Some(0));
    }

    #[test]
    fn ranker_is_deterministic_and_first_seen_wins_ties() {
        let sources = vec![
            source("http://a.example/", 75, true),
            source("http://b.example/", 75, true),
        ];

        let first = pick_best_source(&[0, 1], &sources);
        assert_eq!(first, Some(0));
        // Idempotent: the same unchanged set always yields the same pick.
        assert_eq!(pick_best_source(&[0, 1], &sources), first);
        assert_eq!(pick_best_source(&[1, 0], &sources), Some(1));
    }

    #[test]
    fn ranker_returns_none_for_empty_set() {
        let sources = vec![source("http://a.example/", 10, true)];
        assert_eq!(pick_best_source(&[], &sources), None);
    }

    #[test]
    fn link_filename_strips_path() {
        assert_eq!(
            link_filename("http://a.example/maps/dm_lockdown.bsp.bz2"),
            "dm_lockdown.bsp.bz2"
        );
        assert_eq!(link_filename("dm_lockdown.bsp.bz2"), "dm_lockdown.bsp.bz2");
    }
}
