//! Versioned shared-library alias repair
//!
//! A library directory holding `libcudnn.so.8.9.7` needs `libcudnn.so.8` to be
//! a symlink to it. Manual extraction (or a `cp` that dereferenced links)
//! leaves real files or stale links at those alias paths; this module puts
//! the chain back. A real file found at an alias path is moved into a
//! timestamped backup directory before the link replaces it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::fs::Backups;
use crate::error::{Result, file_read_failed, file_write_failed};
use crate::gate::Gate;

/// What a normalization pass changed (or, in dry-run, would change)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeReport {
    pub created: Vec<PathBuf>,
    pub replaced: Vec<PathBuf>,
    pub backed_up: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

impl NormalizeReport {
    pub fn changed(&self) -> usize {
        self.created.len() + self.replaced.len() + self.backed_up.len()
    }
}

/// For `libfoo.so.8.1.2` returns `("libfoo.so.8", [8, 1, 2])`.
/// Needs at least `major.minor` after `.so.`.
pub fn versioned_alias(file_name: &str) -> Option<(String, Vec<u64>)> {
    let (stem, version) = file_name.split_once(".so.")?;
    if stem.is_empty() {
        return None;
    }
    let parts: Vec<u64> = version
        .split('.')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<_>>()?;
    if parts.len() < 2 {
        return None;
    }
    Some((format!("{stem}.so.{}", parts[0]), parts))
}

/// Newest fully versioned regular file per alias name
fn alias_targets(dir: &Path) -> Result<BTreeMap<String, (Vec<u64>, String)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| file_read_failed(dir, e))?;
    let mut targets: BTreeMap<String, (Vec<u64>, String)> = BTreeMap::new();

    for entry in entries {
        let entry = entry.map_err(|e| file_read_failed(dir, e))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some((alias, version)) = versioned_alias(&name) else {
            continue;
        };
        let newer = targets
            .get(&alias)
            .is_none_or(|(current, _)| version > *current);
        if newer {
            targets.insert(alias, (version, name));
        }
    }
    Ok(targets)
}

fn points_at(alias: &Path, dir: &Path, target_name: &str) -> bool {
    let Ok(link) = std::fs::read_link(alias) else {
        return false;
    };
    if link == Path::new(target_name) {
        return true;
    }
    match (
        std::fs::canonicalize(dir.join(&link)),
        std::fs::canonicalize(dir.join(target_name)),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn link(target_name: &str, alias: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target_name, alias).map_err(|e| file_write_failed(alias, e))
}

/// Make every `lib*.so.<major>` alias in `dir` a symlink to its newest
/// versioned file. Correct links are left untouched.
pub fn normalize(dir: &Path, gate: &mut Gate) -> Result<NormalizeReport> {
    let mut report = NormalizeReport::default();
    if !dir.is_dir() {
        return Ok(report);
    }
    let mut backups = Backups::timestamped();

    for (alias_name, (_, target_name)) in alias_targets(dir)? {
        let alias = dir.join(&alias_name);
        match alias.symlink_metadata() {
            Err(_) => {
                gate.execute(
                    format!("link {} -> {target_name}", alias.display()),
                    || link(&target_name, &alias),
                )?;
                report.created.push(alias);
            }
            Ok(meta) if meta.file_type().is_symlink() => {
                if points_at(&alias, dir, &target_name) {
                    report.unchanged.push(alias);
                    continue;
                }
                gate.execute(
                    format!("relink {} -> {target_name}", alias.display()),
                    || {
                        std::fs::remove_file(&alias).map_err(|e| file_write_failed(&alias, e))?;
                        link(&target_name, &alias)
                    },
                )?;
                report.replaced.push(alias);
            }
            Ok(_) => {
                let backup_dir = backups.dir_for(dir);
                gate.execute(
                    format!(
                        "move {} into {} and link it to {target_name}",
                        alias.display(),
                        backup_dir.display()
                    ),
                    || {
                        backups.stash(&alias)?;
                        link(&target_name, &alias)
                    },
                )?;
                report.backed_up.push(alias);
            }
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        changed = report.changed(),
        unchanged = report.unchanged.len(),
        "normalized library aliases"
    );
    Ok(report)
}
