//! Common test utilities for pixgpu integration tests

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A sandboxed system root plus a settings file pointing every managed path
/// into it
#[allow(dead_code)]
pub struct TestWorkspace {
    /// Temporary directory
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Sandbox root
    pub path: PathBuf,
    /// Settings file passed with `--config`
    pub config: PathBuf,
}

impl TestWorkspace {
    /// Create a new sandbox with its settings file
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        let config = path.join("pixgpu.yaml");
        let workspace = Self { temp, path, config };
        workspace.write_file("pixgpu.yaml", &workspace.settings_yaml());
        workspace
    }

    /// Settings without root, required tools or package queries
    fn settings_yaml(&self) -> String {
        let root = self.path.display();
        format!(
            "cuda_prefix: {root}/usr/local\n\
             tensorflow_prefix: {root}/usr/local\n\
             ld_conf_dir: {root}/etc/ld.so.conf.d\n\
             app_root: {root}/opt/PixInsight\n\
             staging_root: {root}/staging\n\
             artifacts_dir: {root}/Downloads\n\
             profile: {root}/home/.bashrc\n\
             require_root: false\n\
             required_tools: []\n\
             command_timeout_secs: 10\n\
             download_timeout_secs: 10\n\
             components:\n  \
               cuda:\n    packages: []\n  \
               cudnn:\n    packages: []\n  \
               tensorflow:\n    packages: []\n"
        )
    }

    /// Write a file in the sandbox
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Read a file from the sandbox
    #[allow(dead_code)]
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    /// Check if a file exists in the sandbox
    #[allow(dead_code)]
    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).symlink_metadata().is_ok()
    }

    /// Sorted list of every entry below the sandbox root
    #[allow(dead_code)]
    pub fn snapshot(&self) -> Vec<String> {
        let mut entries: Vec<String> = walkdir::WalkDir::new(&self.path)
            .min_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| relative(&self.path, entry.path()))
            .collect();
        entries.sort();
        entries
    }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// pixgpu command running against `workspace`
#[allow(deprecated)]
pub fn pixgpu_cmd(workspace: &TestWorkspace) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("pixgpu").expect("pixgpu binary");
    cmd.env_remove("PIXGPU_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--config").arg(&workspace.config);
    cmd
}
