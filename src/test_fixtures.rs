//! Test fixtures: sandbox directories and fake system collaborators.
//!
//! The fakes share one call log so a test can assert on exactly which
//! external operations an action performed.
//!
//! ```ignore
//! let temp = create_temp_dir();
//! let fakes = Fakes::new().with_driver("535.104.05").with_default_archives();
//! let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
//! install(&mut ctx, Component::Cuda, None).unwrap();
//! assert!(fakes.calls().iter().any(|c| c.starts_with("fetch ")));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tempfile::TempDir;

use crate::common::pattern::matches_any;
use crate::config::{ArtifactKind, Component, Settings};
use crate::error::{Result, command_failed};
use crate::gate::{Decision, FixedAnswer, Gate};
use crate::operations::Context;
use crate::system::{DriverQuery, Downloader, Extractor, LinkerCache, PackageManager, System};

/// Create a temp directory in the system temp location.
///
/// # Panics
///
/// Panics if the temp directory cannot be created.
#[must_use]
pub fn create_temp_dir() -> TempDir {
    TempDir::new_in(crate::temp::temp_dir_base()).expect("Failed to create temp directory")
}

/// Create an empty file, and its parent directories
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(path, b"").expect("Failed to create file");
}

#[derive(Debug, Clone)]
pub enum FakeEntry {
    File(Vec<u8>),
    Link(String),
}

type CallLog = Rc<RefCell<Vec<String>>>;

/// Configurable set of fake collaborators
#[derive(Clone, Default)]
pub struct Fakes {
    log: CallLog,
    packages: Rc<RefCell<Vec<String>>>,
    archives: Rc<RefCell<HashMap<String, Vec<(String, FakeEntry)>>>>,
    driver: Option<String>,
    ld_listing: String,
    refresh_fails: bool,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packages(self, names: &[&str]) -> Self {
        self.packages
            .borrow_mut()
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_driver(mut self, version: &str) -> Self {
        self.driver = Some(version.to_string());
        self
    }

    pub fn with_ld_listing(mut self, listing: &str) -> Self {
        self.ld_listing = listing.to_string();
        self
    }

    pub fn with_failing_refresh(mut self) -> Self {
        self.refresh_fails = true;
        self
    }

    /// Register what extracting the artifact named `file_name` produces
    pub fn with_archive(self, file_name: &str, entries: &[(&str, FakeEntry)]) -> Self {
        self.archives.borrow_mut().insert(
            file_name.to_string(),
            entries
                .iter()
                .map(|(path, entry)| (path.to_string(), entry.clone()))
                .collect(),
        );
        self
    }

    /// Archives shaped like the default CUDA, cuDNN and TensorFlow artifacts
    pub fn with_default_archives(self) -> Self {
        let settings = Settings::default();
        let file = |bytes: &[u8]| FakeEntry::File(bytes.to_vec());
        let link = |target: &str| FakeEntry::Link(target.to_string());
        self.with_archive(
            &settings.cuda.artifact_file_name(),
            &[
                ("bin/nvcc", file(b"nvcc")),
                ("include/cuda.h", file(b"cuda")),
                ("lib64/libcudart.so.12.2.140", file(b"cudart")),
                ("lib64/libcudart.so.12", link("libcudart.so.12.2.140")),
            ],
        )
        .with_archive(
            &settings.cudnn.artifact_file_name(),
            &[
                ("include/cudnn.h", file(b"cudnn")),
                ("include/cudnn_version.h", file(b"#define CUDNN_MAJOR 8")),
                ("lib/libcudnn.so.8.9.7", file(b"cudnn")),
                ("lib/libcudnn_ops_infer.so.8.9.7", file(b"ops")),
                ("LICENSE", file(b"license")),
            ],
        )
        .with_archive(
            &settings.tensorflow.artifact_file_name(),
            &[
                ("include/tensorflow/c/c_api.h", file(b"api")),
                ("lib/libtensorflow.so.2.15.0", file(b"tf")),
                ("lib/libtensorflow.so.2", link("libtensorflow.so.2.15.0")),
                ("lib/libtensorflow_framework.so.2.15.0", file(b"fw")),
            ],
        )
    }

    /// Every external call so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn installed_packages(&self) -> Vec<String> {
        self.packages.borrow().clone()
    }

    pub fn system(&self) -> System {
        System {
            packages: Box::new(FakePackages {
                installed: self.packages.clone(),
                log: self.log.clone(),
            }),
            downloader: Box::new(FakeDownloader {
                log: self.log.clone(),
            }),
            extractor: Box::new(FakeExtractor {
                archives: self.archives.clone(),
                log: self.log.clone(),
            }),
            linker: Box::new(FakeLinker {
                listing: self.ld_listing.clone(),
                fails: self.refresh_fails,
                log: self.log.clone(),
            }),
            driver: Box::new(FakeDriver(self.driver.clone())),
        }
    }
}

struct FakePackages {
    installed: Rc<RefCell<Vec<String>>>,
    log: CallLog,
}

impl PackageManager for FakePackages {
    fn installed(&self, patterns: &[String]) -> Result<Vec<String>> {
        Ok(self
            .installed
            .borrow()
            .iter()
            .filter(|name| matches_any(patterns, name))
            .cloned()
            .collect())
    }

    fn purge(&self, packages: &[String]) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("purge {}", packages.join(" ")));
        self.installed
            .borrow_mut()
            .retain(|name| !packages.contains(name));
        Ok(())
    }
}

struct FakeDownloader {
    log: CallLog,
}

impl Downloader for FakeDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.log.borrow_mut().push(format!("fetch {url}"));
        std::fs::write(dest, format!("artifact from {url}"))?;
        Ok(())
    }
}

struct FakeExtractor {
    archives: Rc<RefCell<HashMap<String, Vec<(String, FakeEntry)>>>>,
    log: CallLog,
}

impl Extractor for FakeExtractor {
    fn extract(&self, artifact: &Path, _kind: &ArtifactKind, dest: &Path) -> Result<()> {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.log.borrow_mut().push(format!("extract {name}"));

        let archives = self.archives.borrow();
        let entries = archives
            .get(&name)
            .ok_or_else(|| command_failed("tar", format!("unknown archive {name}")))?;
        for (path, entry) in entries {
            let target = dest.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            match entry {
                FakeEntry::File(bytes) => std::fs::write(&target, bytes)?,
                FakeEntry::Link(to) => std::os::unix::fs::symlink(to, &target)?,
            }
        }
        Ok(())
    }
}

struct FakeLinker {
    listing: String,
    fails: bool,
    log: CallLog,
}

impl LinkerCache for FakeLinker {
    fn list(&self) -> Result<String> {
        Ok(self.listing.clone())
    }

    fn refresh(&self) -> Result<()> {
        self.log.borrow_mut().push("ldconfig".to_string());
        if self.fails {
            return Err(command_failed("ldconfig", "permission denied"));
        }
        Ok(())
    }
}

struct FakeDriver(Option<String>);

impl DriverQuery for FakeDriver {
    fn driver_version(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Context over sandboxed settings and the given fakes
pub fn sandbox_context(root: &Path, fakes: &Fakes, dry_run: bool, answer: Decision) -> Context {
    Context {
        settings: Settings::sandboxed(root),
        system: fakes.system(),
        gate: Gate::new(dry_run, Box::new(FixedAnswer(answer))),
    }
}

/// Put the manually downloaded artifact of `component` where it is looked up
pub fn place_manual_artifact(settings: &Settings, component: Component) {
    let descriptor = settings.descriptor(component);
    let path = settings.artifacts_dir.join(descriptor.artifact_file_name());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create artifacts directory");
    }
    std::fs::write(path, b"manual artifact").expect("Failed to write artifact");
}

/// Relative paths of every file and symlink under `root`, sorted
pub fn snapshot(root: &Path) -> Vec<String> {
    let mut entries: Vec<String> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap_or(e.path());
            let kind = if e.file_type().is_symlink() {
                "link"
            } else if e.file_type().is_dir() {
                "dir"
            } else {
                "file"
            };
            format!("{kind} {}", relative.display())
        })
        .collect();
    entries.sort();
    entries
}
