//! Unpacking artifacts: tarballs through tar, NVIDIA runfiles through sh

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use super::Extractor;
use super::exec;
use crate::config::ArtifactKind;
use crate::error::Result;

pub struct Tar {
    timeout: Duration,
}

impl Tar {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Command that unpacks `artifact` into `dest`
pub fn extract_command(artifact: &Path, kind: &ArtifactKind, dest: &Path) -> Command {
    match kind {
        ArtifactKind::Tarball { strip_components } => {
            let mut command = Command::new("tar");
            command
                .arg("-xf")
                .arg(artifact)
                .arg("-C")
                .arg(dest)
                .arg(format!("--strip-components={strip_components}"));
            command
        }
        ArtifactKind::Runfile => {
            // The runfile unpacks itself into --tmpdir before installing, /tmp
            // is often too small for the toolkit.
            let tmpdir = dest.parent().unwrap_or(dest);
            let mut command = Command::new("sh");
            command
                .arg(artifact)
                .arg("--silent")
                .arg("--toolkit")
                .arg("--no-man-page")
                .arg("--override")
                .arg(format!("--toolkitpath={}", dest.display()))
                .arg(format!("--tmpdir={}", tmpdir.display()));
            command
        }
    }
}

impl Extractor for Tar {
    fn extract(&self, artifact: &Path, kind: &ArtifactKind, dest: &Path) -> Result<()> {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let spinner = crate::progress::spinner(format!("Extracting {name}"));
        let result = exec::run_checked(&mut extract_command(artifact, kind, dest), self.timeout);
        spinner.finish_and_clear();
        result.map(|_| ())
    }
}
