//! Steam install auto-detection
//!
//! Locates a game's content directory by probing the platform's default Steam
//! roots plus every library listed in `steamapps/libraryfolders.vdf`. A
//! candidate is accepted when it already has a `maps/` or `download/` child,
//! which is what distinguishes a playable install from a bare app folder.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Collect `steamapps` roots from a `libraryfolders.vdf` file.
///
/// Only the `"path" "<dir>"` pairs are interpreted; everything else in the
/// VDF is ignored.
fn parse_libraryfolders_vdf(steamapps: &Path) -> Vec<PathBuf> {
    let vdf = steamapps.join("libraryfolders.vdf");
    let Ok(text) = fs::read_to_string(&vdf) else {
        return Vec::new();
    };

    let Ok(re) = Regex::new(r#"(?i)"path"\s*"([^"]+)""#) else {
        return Vec::new();
    };

    re.captures_iter(&text)
        .map(|cap| {
            let raw = cap[1].replace('\\', "/");
            PathBuf::from(raw).join("steamapps")
        })
        .collect()
}

fn default_steamapps_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    #[cfg(windows)]
    {
        for var in ["ProgramFiles(x86)", "ProgramFiles"] {
            if let Ok(pf) = std::env::var(var) {
                roots.push(PathBuf::from(pf).join("Steam").join("steamapps"));
            }
        }
    }

    #[cfg(not(windows))]
    {
        let home = std::env::var("HOME").unwrap_or_default();
        for rel in [
            ".steam/steam/steamapps",
            ".local/share/Steam/steamapps",
            "Library/Application Support/Steam/steamapps",
        ] {
            roots.push(PathBuf::from(&home).join(rel));
        }
    }

    roots
}

/// Find a Steam game's content directory, e.g.
/// `find_steam_game_dir("Half-Life 2 Deathmatch", "hl2mp")`.
///
/// Probes every default root and every library the VDF names, returning the
/// first install that has a `maps/` or `download/` child.
pub fn find_steam_game_dir(app_folder: &str, content_folder: &str) -> Option<PathBuf> {
    let mut steamapps_all = Vec::new();
    for root in default_steamapps_roots() {
        steamapps_all.extend(parse_libraryfolders_vdf(&root));
        steamapps_all.push(root);
    }

    for steamapps in steamapps_all {
        let content = steamapps
            .join("common")
            .join(app_folder)
            .join(content_folder);
        if content.join("maps").exists() || content.join("download").exists() {
            return Some(content.canonicalize().unwrap_or(content));
        }
    }
    None
}
