//! Include/exclude filename filtering
//!
//! Filter specifications are comma-separated substring tokens. Tokens are
//! trimmed, lowercased, and empty tokens dropped; matching is case-insensitive
//! on the filename as well. A name passes when it contains at least one
//! include token (or no includes are configured) and contains no exclude
//! token.

/// Compiled include/exclude filter, built once per run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameFilter {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl NameFilter {
    /// Compile a filter from raw comma-separated specification strings
    pub fn new(include_spec: &str, exclude_spec: &str) -> Self {
        Self {
            includes: split_terms(include_spec),
            excludes: split_terms(exclude_spec),
        }
    }

    /// Whether `name` passes the filter
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();

        if !self.includes.is_empty() && !self.includes.iter().any(|t| name.contains(t)) {
            return false;
        }

        !self.excludes.iter().any(|t| name.contains(t))
    }
}

fn split_terms(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
