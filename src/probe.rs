//! Read-only questions about what is installed
//!
//! Nothing is cached: every call looks at the filesystem, the package
//! database or the linker cache again.

use std::cmp::Ordering;
use std::path::PathBuf;

use serde::Serialize;

use crate::common::pattern::entries_matching;
use crate::config::{Component, Settings};
use crate::error::Result;
use crate::paths::PathResolver;
use crate::system::System;
use crate::system::driver::compare_versions;
use crate::system::linker::listing_contains;

/// Library globs the host application may bundle itself
pub const BUNDLED_TENSORFLOW: &str = "libtensorflow*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallState {
    Absent,
    Partial,
    Present,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCompatibility {
    Compatible { found: String },
    Incompatible { found: String },
    /// No query tool or no GPU
    Undetermined,
}

pub struct Prober<'a> {
    settings: &'a Settings,
    system: &'a System,
}

impl<'a> Prober<'a> {
    pub fn new(settings: &'a Settings, system: &'a System) -> Self {
        Self { settings, system }
    }

    fn paths(&self) -> PathResolver<'a> {
        PathResolver::new(self.settings)
    }

    /// Header and library entries of the component found on disk
    pub fn component_files(&self, component: Component) -> Vec<PathBuf> {
        let descriptor = self.settings.descriptor(component);
        let layout = self.paths().layout(component);
        let mut files = entries_matching(&layout.include_dir, &descriptor.headers);
        files.extend(entries_matching(&layout.lib_dir, &descriptor.libraries));
        files
    }

    /// Present when the marker exists and every library glob matches a file.
    /// Any other trace of the component (root directory, a matching file,
    /// an installed package) makes it Partial.
    pub fn component_state(&self, component: Component) -> Result<InstallState> {
        let descriptor = self.settings.descriptor(component);
        let layout = self.paths().layout(component);

        let marker = layout.root.join(&descriptor.marker).is_file();
        let libraries_found = descriptor
            .libraries
            .iter()
            .all(|glob| !entries_matching(&layout.lib_dir, std::slice::from_ref(glob)).is_empty());
        if marker && libraries_found {
            return Ok(InstallState::Present);
        }

        let root_exists = component == Component::Cuda && layout.root.is_dir();
        let evidence = marker
            || root_exists
            || !self.component_files(component).is_empty()
            || !self.installed_packages(&descriptor.packages)?.is_empty();

        tracing::debug!(%component, marker, libraries_found, evidence, "probed component");
        Ok(if evidence {
            InstallState::Partial
        } else {
            InstallState::Absent
        })
    }

    pub fn is_component_installed(&self, component: Component) -> Result<bool> {
        Ok(self.component_state(component)? == InstallState::Present)
    }

    /// Whether the linker cache lists a library starting with `name`
    pub fn is_library_registered(&self, name: &str) -> Result<bool> {
        let listing = self.system.linker.list()?;
        Ok(listing_contains(&listing, name))
    }

    pub fn driver_compatibility(&self, required: &str) -> DriverCompatibility {
        match self.system.driver.driver_version() {
            None => DriverCompatibility::Undetermined,
            Some(found) if compare_versions(&found, required) == Ordering::Less => {
                DriverCompatibility::Incompatible { found }
            }
            Some(found) => DriverCompatibility::Compatible { found },
        }
    }

    /// TensorFlow libraries the host application ships in its own lib dir
    pub fn conflicting_bundles(&self) -> Vec<PathBuf> {
        entries_matching(
            &self.paths().app_lib_dir(),
            &[BUNDLED_TENSORFLOW.to_string()],
        )
    }

    pub fn is_host_app_installed(&self) -> bool {
        self.paths().app_executable().is_file()
    }

    pub fn installed_packages(&self, globs: &[String]) -> Result<Vec<String>> {
        if globs.is_empty() {
            return Ok(Vec::new());
        }
        self.system.packages.installed(globs)
    }
}
