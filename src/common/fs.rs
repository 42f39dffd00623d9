//! File system operations with unified error handling
//!
//! Placement copies never clobber a real file: an existing regular file at a
//! destination is first moved into a backup directory next to it.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

use super::pattern::entries_matching;
use crate::error::{Result, file_read_failed, file_write_failed};

/// Suffix for in-flight copies that get renamed into place
const PARTIAL_SUFFIX: &str = ".pixgpu-partial";

/// `pixgpu-backup-<unix seconds>`
pub fn timestamped_backup_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("pixgpu-backup-{secs}")
}

/// Backup directories created lazily, one per parent directory of the files
/// they receive. Never pruned.
#[derive(Debug)]
pub struct Backups {
    name: String,
    dirs: HashMap<PathBuf, PathBuf>,
}

impl Backups {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dirs: HashMap::new(),
        }
    }

    pub fn timestamped() -> Self {
        Self::new(timestamped_backup_name())
    }

    /// Backup directory that a file in `parent` would be moved into
    pub fn dir_for(&self, parent: &Path) -> PathBuf {
        parent.join(&self.name)
    }

    /// Move `path` into the backup directory beside it
    pub fn stash(&mut self, path: &Path) -> Result<PathBuf> {
        let parent = path
            .parent()
            .ok_or_else(|| file_write_failed(path, "path has no parent directory"))?;
        let dir = match self.dirs.get(parent) {
            Some(dir) => dir.clone(),
            None => {
                let dir = self.dir_for(parent);
                fs::create_dir_all(&dir).map_err(|e| file_write_failed(&dir, e))?;
                self.dirs.insert(parent.to_path_buf(), dir.clone());
                dir
            }
        };

        let file_name = path
            .file_name()
            .ok_or_else(|| file_write_failed(path, "path has no file name"))?;
        let mut target = dir.join(file_name);
        let mut n = 1;
        while target.symlink_metadata().is_ok() {
            target = dir.join(format!("{}.{n}", file_name.to_string_lossy()));
            n += 1;
        }

        fs::rename(path, &target).map_err(|e| file_write_failed(path, e))?;
        tracing::info!(from = %path.display(), to = %target.display(), "backed up");
        Ok(target)
    }

    /// Directories created so far
    pub fn created(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.dirs.values().cloned().collect();
        dirs.sort();
        dirs
    }
}

/// What a [`copy_tree`] call did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub files: usize,
    pub links: usize,
    pub unchanged: usize,
    pub backed_up: usize,
}

impl CopyReport {
    pub fn merge(&mut self, other: CopyReport) {
        self.files += other.files;
        self.links += other.links;
        self.unchanged += other.unchanged;
        self.backed_up += other.backed_up;
    }

    /// Files and links written
    pub fn written(&self) -> usize {
        self.files + self.links
    }
}

fn same_contents(a: &Path, b: &Path) -> bool {
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(ma), Ok(mb)) if ma.len() == mb.len() => match (fs::read(a), fs::read(b)) {
            (Ok(ca), Ok(cb)) => ca == cb,
            _ => false,
        },
        _ => false,
    }
}

/// Copy `src` into `dst` recursively, preserving symlinks as symlinks.
///
/// Each regular file is written under a temporary name and renamed into
/// place. Identical destination files are left alone; differing ones are
/// moved into `backups` first.
pub fn copy_tree(src: &Path, dst: &Path, backups: &mut Backups) -> Result<CopyReport> {
    let mut report = CopyReport::default();
    fs::create_dir_all(dst).map_err(|e| file_write_failed(dst, e))?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| file_read_failed(src, e))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| file_read_failed(entry.path(), e))?;
        place_entry(
            entry.path(),
            entry.file_type(),
            &dst.join(relative),
            backups,
            &mut report,
        )?;
    }

    Ok(report)
}

/// Copy the direct children of `src` whose names match `patterns` into
/// `dst`; matching directories are copied whole
pub fn copy_matching(
    src: &Path,
    patterns: &[String],
    dst: &Path,
    backups: &mut Backups,
) -> Result<CopyReport> {
    let mut report = CopyReport::default();
    let entries = entries_matching(src, patterns);
    if entries.is_empty() {
        return Ok(report);
    }
    fs::create_dir_all(dst).map_err(|e| file_write_failed(dst, e))?;

    for path in entries {
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = dst.join(name);
        let file_type = path
            .symlink_metadata()
            .map_err(|e| file_read_failed(&path, e))?
            .file_type();
        if file_type.is_dir() {
            report.merge(copy_tree(&path, &target, backups)?);
        } else {
            place_entry(&path, file_type, &target, backups, &mut report)?;
        }
    }
    Ok(report)
}

fn place_entry(
    source: &Path,
    file_type: fs::FileType,
    target: &Path,
    backups: &mut Backups,
    report: &mut CopyReport,
) -> Result<()> {
    if file_type.is_dir() {
        if let Ok(meta) = target.symlink_metadata() {
            if !meta.is_dir() {
                backups.stash(target)?;
                report.backed_up += 1;
            }
        }
        fs::create_dir_all(target).map_err(|e| file_write_failed(target, e))?;
    } else if file_type.is_symlink() {
        let link = fs::read_link(source).map_err(|e| file_read_failed(source, e))?;
        match target.symlink_metadata() {
            Ok(meta) if meta.file_type().is_symlink() => {
                if fs::read_link(target).ok().as_deref() == Some(link.as_path()) {
                    report.unchanged += 1;
                    return Ok(());
                }
                fs::remove_file(target).map_err(|e| file_write_failed(target, e))?;
            }
            Ok(_) => {
                backups.stash(target)?;
                report.backed_up += 1;
            }
            Err(_) => {}
        }
        std::os::unix::fs::symlink(&link, target).map_err(|e| file_write_failed(target, e))?;
        report.links += 1;
    } else {
        match target.symlink_metadata() {
            Ok(meta) if meta.is_file() && same_contents(source, target) => {
                report.unchanged += 1;
                return Ok(());
            }
            Ok(meta) if meta.file_type().is_symlink() => {
                fs::remove_file(target).map_err(|e| file_write_failed(target, e))?;
            }
            Ok(_) => {
                backups.stash(target)?;
                report.backed_up += 1;
            }
            Err(_) => {}
        }
        copy_file_atomic(source, target)?;
        report.files += 1;
    }
    Ok(())
}

/// Copy a single file by writing a sibling temp file and renaming it
pub fn copy_file_atomic(src: &Path, dst: &Path) -> Result<()> {
    let mut partial = dst.as_os_str().to_owned();
    partial.push(PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    fs::copy(src, &partial).map_err(|e| file_write_failed(dst, e))?;
    fs::rename(&partial, dst).map_err(|e| {
        let _ = fs::remove_file(&partial);
        file_write_failed(dst, e)
    })
}

/// Replace `path` with `content` atomically, keeping mode and owner of an
/// existing file
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| file_write_failed(parent, e))?;

    let existing = fs::metadata(path).ok();
    let mut temp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| file_write_failed(path, e))?;
    temp.write_all(content)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| file_write_failed(path, e))?;

    if let Some(meta) = &existing {
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(meta.mode() & 0o7777))
            .map_err(|e| file_write_failed(path, e))?;
        if meta.uid() != current_uid()? {
            std::os::unix::fs::chown(temp.path(), Some(meta.uid()), Some(meta.gid()))
                .map_err(|e| file_write_failed(path, e))?;
        }
    }

    temp.persist(path)
        .map_err(|e| file_write_failed(path, e.error))?;
    Ok(())
}

/// Effective owner of this process, read from procfs
pub fn current_uid() -> Result<u32> {
    let proc_self = Path::new("/proc/self");
    fs::metadata(proc_self)
        .map(|m| m.uid())
        .map_err(|e| file_read_failed(proc_self, e))
}

/// Remove a file, symlink or directory tree
pub fn remove_path(path: &Path) -> Result<()> {
    let meta = path
        .symlink_metadata()
        .map_err(|e| file_write_failed(path, e))?;
    if meta.is_dir() {
        fs::remove_dir_all(path).map_err(|e| file_write_failed(path, e))
    } else {
        fs::remove_file(path).map_err(|e| file_write_failed(path, e))
    }
}
