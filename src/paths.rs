//! Canonical filesystem locations
//!
//! Nothing here fails: a location that does not exist yet is still a valid
//! answer, so later steps can create it.

use std::path::{Path, PathBuf};

use crate::config::{Component, Settings};

/// Library subdirectories of a CUDA root, in probe order
pub const CUDA_LIB_CANDIDATES: [&str; 3] = ["lib64", "targets/x86_64-linux/lib", "lib"];

/// Where a component's files live once installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLayout {
    pub root: PathBuf,
    pub include_dir: PathBuf,
    pub lib_dir: PathBuf,
}

pub struct PathResolver<'a> {
    settings: &'a Settings,
}

impl<'a> PathResolver<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// `<cuda_prefix>/cuda-<major>.<minor>`
    pub fn cuda_root(&self, version: &str) -> PathBuf {
        self.settings
            .cuda_prefix
            .join(format!("cuda-{}", major_minor(version)))
    }

    /// First existing library directory under `root`, else the first candidate
    pub fn cuda_lib_dir(&self, root: &Path) -> PathBuf {
        CUDA_LIB_CANDIDATES
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|dir| dir.is_dir())
            .unwrap_or_else(|| root.join(CUDA_LIB_CANDIDATES[0]))
    }

    pub fn layout(&self, component: Component) -> ComponentLayout {
        match component {
            Component::Cuda | Component::Cudnn => {
                let root = self.cuda_root(&self.settings.cuda.version);
                ComponentLayout {
                    include_dir: root.join("include"),
                    lib_dir: self.cuda_lib_dir(&root),
                    root,
                }
            }
            Component::Tensorflow => {
                let root = self.settings.tensorflow_prefix.clone();
                ComponentLayout {
                    include_dir: root.join("include"),
                    lib_dir: root.join("lib"),
                    root,
                }
            }
        }
    }

    /// `<ld_conf_dir>/cuda-<major>-<minor>.conf`
    pub fn linker_conf(&self, version: &str) -> PathBuf {
        self.settings
            .ld_conf_dir
            .join(format!("cuda-{}.conf", major_minor(version).replace('.', "-")))
    }

    pub fn staging_dir(&self, component: Component) -> PathBuf {
        let descriptor = self.settings.descriptor(component);
        self.settings
            .staging_root
            .join(format!("{}-{}", component.id(), descriptor.version))
    }

    /// Directory holding the host application's bundled libraries
    pub fn app_lib_dir(&self) -> PathBuf {
        self.settings.app_root.join("bin").join("lib")
    }

    pub fn app_executable(&self) -> PathBuf {
        self.settings.app_root.join("bin").join("PixInsight")
    }

    /// Shell profile of the user who invoked pixgpu, even under sudo
    pub fn profile(&self) -> PathBuf {
        if let Some(profile) = &self.settings.profile {
            return profile.clone();
        }
        invoking_user_home()
            .unwrap_or_else(|| PathBuf::from("/root"))
            .join(".bashrc")
    }
}

fn major_minor(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Home of `SUDO_USER` when running under sudo, else `$HOME`
pub fn invoking_user_home() -> Option<PathBuf> {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if let Ok(passwd) = std::fs::read_to_string("/etc/passwd") {
            if let Some(home) = home_from_passwd(&passwd, &user) {
                return Some(home);
            }
        }
    }
    dirs::home_dir()
}

/// Look up a user's home directory in passwd(5) content
pub fn home_from_passwd(passwd: &str, user: &str) -> Option<PathBuf> {
    passwd
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.len() >= 7 && fields[0] == user)
        .map(|fields| PathBuf::from(fields[5]))
}
