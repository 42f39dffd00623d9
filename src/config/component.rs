//! Component descriptors
//!
//! One descriptor per managed component. The defaults below pin the versions
//! PixInsight's GPU acceleration is known to work with; a settings file may
//! override any field (see [`DescriptorOverride`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A component managed by pixgpu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Cuda,
    Cudnn,
    Tensorflow,
}

impl Component {
    /// Order in which "install everything" runs
    pub const INSTALL_ORDER: [Component; 3] =
        [Component::Cuda, Component::Cudnn, Component::Tensorflow];

    /// Order in which "remove everything" runs. TensorFlow and cuDNN live
    /// relative to the CUDA root and go first.
    pub const REMOVAL_ORDER: [Component; 3] =
        [Component::Tensorflow, Component::Cudnn, Component::Cuda];

    /// Short identifier used for staging directories and CLI arguments
    pub fn id(self) -> &'static str {
        match self {
            Component::Cuda => "cuda",
            Component::Cudnn => "cudnn",
            Component::Tensorflow => "tensorflow",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Where an artifact comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Fetched by the downloader
    Url(String),
    /// Requires a vendor login; the user downloads it by hand
    Manual { file_name: String, page: String },
}

/// How an artifact is unpacked into the staging area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// NVIDIA self-extracting installer
    Runfile,
    /// `.tar.gz` / `.tar.xz` archive
    Tarball { strip_components: u32 },
}

/// Static description of a component: what to fetch and what it looks like
/// once installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Human readable name
    pub name: String,

    /// Version of the artifact that gets fetched and placed
    pub version: String,

    pub source: ArtifactSource,

    pub kind: ArtifactKind,

    /// File relative to the component root whose presence marks an install
    pub marker: String,

    /// Entries of the include directory that belong to the component
    #[serde(default)]
    pub headers: Vec<String>,

    /// Entries of the library directory that belong to the component
    #[serde(default)]
    pub libraries: Vec<String>,

    /// Package names (globs) that installed copies of the component
    #[serde(default)]
    pub packages: Vec<String>,

    /// Minimum NVIDIA driver version
    #[serde(default)]
    pub min_driver: Option<String>,

    /// Pinned BLAKE3 digest of the artifact, `blake3:<hex>`
    #[serde(default)]
    pub blake3: Option<String>,
}

impl ComponentDescriptor {
    /// File name of the artifact inside the staging area
    pub fn artifact_file_name(&self) -> String {
        match &self.source {
            ArtifactSource::Url(url) => url
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .unwrap_or("artifact")
                .to_string(),
            ArtifactSource::Manual { file_name, .. } => file_name.clone(),
        }
    }

    pub fn cuda_default() -> Self {
        Self {
            name: "CUDA Toolkit".to_string(),
            version: "12.2.2".to_string(),
            source: ArtifactSource::Url(
                "https://developer.download.nvidia.com/compute/cuda/12.2.2/local_installers/cuda_12.2.2_535.104.05_linux.run"
                    .to_string(),
            ),
            kind: ArtifactKind::Runfile,
            marker: "bin/nvcc".to_string(),
            headers: vec![],
            libraries: vec!["libcudart.so*".to_string()],
            packages: vec![
                "cuda-toolkit-12-2".to_string(),
                "cuda-*-12-2".to_string(),
                "nvidia-cuda-toolkit".to_string(),
            ],
            min_driver: Some("535.54.03".to_string()),
            blake3: None,
        }
    }

    pub fn cudnn_default() -> Self {
        Self {
            name: "cuDNN".to_string(),
            version: "8.9.7.29".to_string(),
            source: ArtifactSource::Manual {
                file_name: "cudnn-linux-x86_64-8.9.7.29_cuda12-archive.tar.xz".to_string(),
                page: "https://developer.nvidia.com/rdp/cudnn-archive".to_string(),
            },
            kind: ArtifactKind::Tarball {
                strip_components: 1,
            },
            marker: "include/cudnn_version.h".to_string(),
            headers: vec!["cudnn*.h".to_string()],
            libraries: vec!["libcudnn*.so*".to_string()],
            packages: vec!["libcudnn8".to_string(), "libcudnn8-dev".to_string()],
            min_driver: None,
            blake3: None,
        }
    }

    pub fn tensorflow_default() -> Self {
        Self {
            name: "TensorFlow C API".to_string(),
            version: "2.15.0".to_string(),
            source: ArtifactSource::Url(
                "https://storage.googleapis.com/tensorflow/libtensorflow/libtensorflow-gpu-linux-x86_64-2.15.0.tar.gz"
                    .to_string(),
            ),
            kind: ArtifactKind::Tarball {
                strip_components: 0,
            },
            marker: "include/tensorflow/c/c_api.h".to_string(),
            headers: vec!["tensorflow".to_string()],
            libraries: vec!["libtensorflow*.so*".to_string()],
            packages: vec![],
            min_driver: None,
            blake3: None,
        }
    }
}

/// Partial descriptor read from a settings file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorOverride {
    pub name: Option<String>,
    pub version: Option<String>,
    pub source: Option<ArtifactSource>,
    pub kind: Option<ArtifactKind>,
    pub marker: Option<String>,
    pub headers: Option<Vec<String>>,
    pub libraries: Option<Vec<String>>,
    pub packages: Option<Vec<String>>,
    pub min_driver: Option<String>,
    pub blake3: Option<String>,
}

impl DescriptorOverride {
    pub fn apply(self, descriptor: &mut ComponentDescriptor) {
        if let Some(name) = self.name {
            descriptor.name = name;
        }
        if let Some(version) = self.version {
            descriptor.version = version;
        }
        if let Some(source) = self.source {
            descriptor.source = source;
        }
        if let Some(kind) = self.kind {
            descriptor.kind = kind;
        }
        if let Some(marker) = self.marker {
            descriptor.marker = marker;
        }
        if let Some(headers) = self.headers {
            descriptor.headers = headers;
        }
        if let Some(libraries) = self.libraries {
            descriptor.libraries = libraries;
        }
        if let Some(packages) = self.packages {
            descriptor.packages = packages;
        }
        if self.min_driver.is_some() {
            descriptor.min_driver = self.min_driver;
        }
        if self.blake3.is_some() {
            descriptor.blake3 = self.blake3;
        }
    }
}
