//! Settings: every path, descriptor and timeout the actions use
//!
//! Defaults describe a stock Ubuntu workstation. A YAML file passed with
//! `--config` overrides individual fields; anything it leaves out keeps its
//! default.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::component::{Component, ComponentDescriptor, DescriptorOverride};
use crate::error::{Result, config_parse_failed, config_read_failed};

/// Tools that must be on PATH before any action runs
pub const DEFAULT_REQUIRED_TOOLS: [&str; 5] = ["apt-get", "dpkg-query", "wget", "tar", "ldconfig"];

#[derive(Debug, Clone)]
pub struct Settings {
    /// Parent of `cuda-<major>.<minor>`
    pub cuda_prefix: PathBuf,
    /// Prefix receiving TensorFlow's `include/` and `lib/`
    pub tensorflow_prefix: PathBuf,
    pub ld_conf_dir: PathBuf,
    /// PixInsight installation root
    pub app_root: PathBuf,
    pub staging_root: PathBuf,
    /// Where manually downloaded artifacts are looked up
    pub artifacts_dir: PathBuf,
    /// Explicit shell profile; resolved from the invoking user when unset
    pub profile: Option<PathBuf>,
    /// Text between `# >>>` and `>>>` of the profile block markers
    pub marker: String,
    /// Environment variable exported as `"true"` in the profile block
    pub feature_flag: String,
    pub require_root: bool,
    pub required_tools: Vec<String>,
    pub command_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub cuda: ComponentDescriptor,
    pub cudnn: ComponentDescriptor,
    pub tensorflow: ComponentDescriptor,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        Self {
            cuda_prefix: PathBuf::from("/usr/local"),
            tensorflow_prefix: PathBuf::from("/usr/local"),
            ld_conf_dir: PathBuf::from("/etc/ld.so.conf.d"),
            app_root: PathBuf::from("/opt/PixInsight"),
            staging_root: crate::temp::default_staging_root(),
            artifacts_dir: home.join("Downloads"),
            profile: None,
            marker: "pixgpu".to_string(),
            feature_flag: "TF_FORCE_GPU_ALLOW_GROWTH".to_string(),
            require_root: true,
            required_tools: DEFAULT_REQUIRED_TOOLS.iter().map(|t| t.to_string()).collect(),
            command_timeout_secs: 600,
            download_timeout_secs: 3600,
            cuda: ComponentDescriptor::cuda_default(),
            cudnn: ComponentDescriptor::cudnn_default(),
            tensorflow: ComponentDescriptor::tensorflow_default(),
        }
    }
}

/// On-disk form of [`Settings`]; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    cuda_prefix: Option<PathBuf>,
    tensorflow_prefix: Option<PathBuf>,
    ld_conf_dir: Option<PathBuf>,
    app_root: Option<PathBuf>,
    staging_root: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    profile: Option<PathBuf>,
    marker: Option<String>,
    feature_flag: Option<String>,
    require_root: Option<bool>,
    required_tools: Option<Vec<String>>,
    command_timeout_secs: Option<u64>,
    download_timeout_secs: Option<u64>,
    #[serde(default)]
    components: ComponentOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComponentOverrides {
    cuda: Option<DescriptorOverride>,
    cudnn: Option<DescriptorOverride>,
    tensorflow: Option<DescriptorOverride>,
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

impl Settings {
    /// Load settings from an optional YAML file on top of the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::default();
        let Some(path) = path else {
            return Ok(settings);
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| config_read_failed(path.display().to_string(), e))?;
        settings.apply_yaml(&content).map_err(|e| match e {
            crate::error::PixGpuError::ConfigParseFailed { reason, .. } => {
                config_parse_failed(path.display().to_string(), reason)
            }
            other => other,
        })?;
        Ok(settings)
    }

    /// Apply a YAML document of overrides
    pub fn apply_yaml(&mut self, yaml: &str) -> Result<()> {
        if yaml.trim().is_empty() {
            return Ok(());
        }
        let file: SettingsFile = serde_yaml::from_str(yaml)?;

        let paths = [
            (file.cuda_prefix, &mut self.cuda_prefix),
            (file.tensorflow_prefix, &mut self.tensorflow_prefix),
            (file.ld_conf_dir, &mut self.ld_conf_dir),
            (file.app_root, &mut self.app_root),
            (file.staging_root, &mut self.staging_root),
            (file.artifacts_dir, &mut self.artifacts_dir),
        ];
        for (value, slot) in paths {
            if let Some(value) = value {
                *slot = expand_home(&value);
            }
        }

        if let Some(profile) = file.profile {
            self.profile = Some(expand_home(&profile));
        }
        if let Some(marker) = file.marker {
            self.marker = marker;
        }
        if let Some(flag) = file.feature_flag {
            self.feature_flag = flag;
        }
        if let Some(require_root) = file.require_root {
            self.require_root = require_root;
        }
        if let Some(tools) = file.required_tools {
            self.required_tools = tools;
        }
        if let Some(secs) = file.command_timeout_secs {
            self.command_timeout_secs = secs;
        }
        if let Some(secs) = file.download_timeout_secs {
            self.download_timeout_secs = secs;
        }

        if let Some(patch) = file.components.cuda {
            patch.apply(&mut self.cuda);
        }
        if let Some(patch) = file.components.cudnn {
            patch.apply(&mut self.cudnn);
        }
        if let Some(patch) = file.components.tensorflow {
            patch.apply(&mut self.tensorflow);
        }
        Ok(())
    }

    pub fn descriptor(&self, component: Component) -> &ComponentDescriptor {
        match component {
            Component::Cuda => &self.cuda,
            Component::Cudnn => &self.cudnn,
            Component::Tensorflow => &self.tensorflow,
        }
    }

    /// Settings rooted entirely inside `root`, for tests
    #[cfg(test)]
    pub fn sandboxed(root: &Path) -> Self {
        Self {
            cuda_prefix: root.join("usr/local"),
            tensorflow_prefix: root.join("usr/local"),
            ld_conf_dir: root.join("etc/ld.so.conf.d"),
            app_root: root.join("opt/PixInsight"),
            staging_root: root.join("staging"),
            artifacts_dir: root.join("Downloads"),
            profile: Some(root.join("home/.bashrc")),
            require_root: false,
            required_tools: vec![],
            command_timeout_secs: 5,
            download_timeout_secs: 5,
            ..Self::default()
        }
    }
}
