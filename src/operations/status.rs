//! Read-only status report, shown by the menu and `pixgpu status`

use std::path::PathBuf;

use serde::Serialize;

use super::host_app::BACKUP_DIR_NAME;
use crate::config::{Component, Settings};
use crate::error::Result;
use crate::paths::PathResolver;
use crate::probe::{DriverCompatibility, InstallState, Prober};
use crate::profile::ProfileEditor;
use crate::system::System;

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub component: Component,
    pub name: String,
    pub version: String,
    pub state: InstallState,
    pub root: PathBuf,
    pub lib_dir: PathBuf,
    /// `None` when the linker cache could not be read
    pub registered: Option<bool>,
    pub packages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DriverStatus {
    pub version: Option<String>,
    pub required: Option<String>,
    pub compatible: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Absent,
    Present,
    Malformed,
}

#[derive(Debug, Serialize)]
pub struct ProfileStatus {
    pub path: PathBuf,
    pub block: BlockStatus,
}

#[derive(Debug, Serialize)]
pub struct HostAppStatus {
    pub root: PathBuf,
    pub installed: bool,
    pub bundled_tensorflow: Vec<PathBuf>,
    pub patched: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub driver: DriverStatus,
    pub components: Vec<ComponentStatus>,
    pub linker_conf: PathBuf,
    pub linker_conf_present: bool,
    pub profile: ProfileStatus,
    pub host_app: HostAppStatus,
}

/// Prefix of the first library glob, e.g. `libcudnn` for `libcudnn*.so*`
pub fn library_stem(glob: &str) -> &str {
    let end = glob.find(['*', '?', '[', '.']).unwrap_or(glob.len());
    &glob[..end]
}

pub fn collect(settings: &Settings, system: &System) -> Result<StatusReport> {
    let prober = Prober::new(settings, system);
    let paths = PathResolver::new(settings);

    let required = settings.cuda.min_driver.clone();
    let version = system.driver.driver_version();
    let compatible = required
        .as_deref()
        .filter(|_| version.is_some())
        .map(|required| {
            matches!(
                prober.driver_compatibility(required),
                DriverCompatibility::Compatible { .. }
            )
        });

    let mut components = Vec::new();
    for component in Component::INSTALL_ORDER {
        let descriptor = settings.descriptor(component);
        let layout = paths.layout(component);
        let registered = descriptor.libraries.first().and_then(|glob| {
            prober
                .is_library_registered(library_stem(glob))
                .inspect_err(|e| tracing::debug!(error = %e, "linker cache unavailable"))
                .ok()
        });
        components.push(ComponentStatus {
            component,
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            state: prober.component_state(component)?,
            root: layout.root,
            lib_dir: layout.lib_dir,
            registered,
            packages: prober.installed_packages(&descriptor.packages)?,
        });
    }

    let editor = ProfileEditor::new(paths.profile(), &settings.marker);
    let block = match editor.has_block() {
        Ok(true) => BlockStatus::Present,
        Ok(false) => BlockStatus::Absent,
        Err(e) => {
            tracing::warn!(error = %e, "profile block is malformed");
            BlockStatus::Malformed
        }
    };

    let linker_conf = paths.linker_conf(&settings.cuda.version);
    Ok(StatusReport {
        driver: DriverStatus {
            version,
            required,
            compatible,
        },
        components,
        linker_conf_present: linker_conf.is_file(),
        linker_conf,
        profile: ProfileStatus {
            path: editor.path().to_path_buf(),
            block,
        },
        host_app: HostAppStatus {
            root: settings.app_root.clone(),
            installed: prober.is_host_app_installed(),
            bundled_tensorflow: prober.conflicting_bundles(),
            patched: paths.app_lib_dir().join(BACKUP_DIR_NAME).is_dir(),
        },
    })
}
