//! Glob matching for package names and library file names

use std::path::{Path, PathBuf};

use wax::{CandidatePath, Glob, Pattern};

/// Check if a glob pattern matches a single name
///
/// Uses wax for glob matching. An invalid pattern only matches itself.
pub fn matches_glob(pattern: &str, name: &str) -> bool {
    let candidate = CandidatePath::from(name);
    match Glob::new(pattern) {
        Ok(glob) => glob.matched(&candidate).is_some(),
        Err(_) => pattern == name,
    }
}

pub fn matches_any(patterns: &[String], name: &str) -> bool {
    patterns.iter().any(|pattern| matches_glob(pattern, name))
}

/// Direct children of `dir` whose file name matches any pattern, sorted.
/// A missing directory has no entries.
pub fn entries_matching(dir: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut matched: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| matches_any(patterns, &entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();
    matched.sort();
    matched
}
