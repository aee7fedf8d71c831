//! Local file-set scan
//!
//! Rebuilds the set of locally present map filenames at the start of every
//! run by walking the two places the game keeps maps: `maps/` (shipped) and
//! `download/maps/` (previously synced). Only the two recognized extensions
//! count; names are kept as-is, case-sensitive, so reconciliation matches
//! listings exactly.

use crate::types::MAP_EXTENSIONS;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

pub(crate) fn scan_existing_files(target: &Path) -> HashSet<String> {
    let roots = [target.join("maps"), target.join("download").join("maps")];
    let mut existing = HashSet::new();

    for root in roots {
        if !root.exists() {
            continue;
        }
        for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase());
            let matches = ext
                .as_deref()
                .is_some_and(|e| MAP_EXTENSIONS.contains(&e));
            if matches {
                existing.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
    }
    existing
}
