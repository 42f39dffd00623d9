//! External collaborators: package database, downloader, archive tool,
//! linker cache and GPU driver
//!
//! Actions only see the traits below. [`System::host`] wires the real
//! implementations, which shell out with a timeout; tests wire fakes.

pub mod apt;
pub mod archive;
pub mod download;
pub mod driver;
pub mod exec;
pub mod linker;

use std::path::Path;
use std::time::Duration;

use crate::config::{ArtifactKind, Settings};
use crate::error::{Result, missing_dependency};

/// System package database
pub trait PackageManager {
    /// Installed package names matching any of `patterns`
    fn installed(&self, patterns: &[String]) -> Result<Vec<String>>;

    fn purge(&self, packages: &[String]) -> Result<()>;
}

pub trait Downloader {
    /// Fetch `url` into `dest`, resuming a partial file
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

pub trait Extractor {
    /// Unpack `artifact` into the (existing) directory `dest`
    fn extract(&self, artifact: &Path, kind: &ArtifactKind, dest: &Path) -> Result<()>;
}

/// Dynamic linker cache
pub trait LinkerCache {
    /// Raw `ldconfig -p` listing
    fn list(&self) -> Result<String>;

    fn refresh(&self) -> Result<()>;
}

pub trait DriverQuery {
    /// Installed NVIDIA driver version, `None` when it cannot be determined
    fn driver_version(&self) -> Option<String>;
}

/// Bundle of collaborators handed to every action
pub struct System {
    pub packages: Box<dyn PackageManager>,
    pub downloader: Box<dyn Downloader>,
    pub extractor: Box<dyn Extractor>,
    pub linker: Box<dyn LinkerCache>,
    pub driver: Box<dyn DriverQuery>,
}

impl System {
    /// Real implementations backed by apt, wget, tar, ldconfig and nvidia-smi
    pub fn host(settings: &Settings) -> Self {
        let timeout = Duration::from_secs(settings.command_timeout_secs);
        Self {
            packages: Box::new(apt::Apt::new(timeout)),
            downloader: Box::new(download::Wget::new(Duration::from_secs(
                settings.download_timeout_secs,
            ))),
            extractor: Box::new(archive::Tar::new(timeout)),
            linker: Box::new(linker::Ldconfig::new(timeout)),
            driver: Box::new(driver::NvidiaSmi::new(timeout)),
        }
    }
}

/// Fail with the first required tool missing from PATH
pub fn check_required_tools(tools: &[String]) -> Result<()> {
    for tool in tools {
        if which::which(tool).is_err() {
            return Err(missing_dependency(tool.clone()));
        }
        tracing::debug!(tool = %tool, "found required tool");
    }
    Ok(())
}
