//! The four install stages of one component
//!
//! Every stage maps its failure to [`InstallFailed`](crate::error::PixGpuError::InstallFailed)
//! with the stage attached, and performs its mutations through the gate.

use std::path::{Path, PathBuf};

use crate::common::fs::{Backups, CopyReport, atomic_write, copy_matching, copy_tree, remove_path};
use crate::config::{ArtifactSource, Component, ComponentDescriptor, Settings};
use crate::error::{InstallStage, PixGpuError, Result, file_write_failed, install_failed};
use crate::gate::Gate;
use crate::hash::verify_file;
use crate::operations::refresh_linker;
use crate::paths::PathResolver;
use crate::profile::{ProfileEditor, cuda_exports};
use crate::symlinks;
use crate::system::System;
use crate::ui;

/// Library directories of an extracted archive, in lookup order
const ARCHIVE_LIB_DIRS: [&str; 2] = ["lib64", "lib"];

pub(super) struct Installation<'a> {
    settings: &'a Settings,
    system: &'a System,
    component: Component,
    descriptor: &'a ComponentDescriptor,
    staging: PathBuf,
}

impl<'a> Installation<'a> {
    pub(super) fn new(settings: &'a Settings, system: &'a System, component: Component) -> Self {
        Self {
            settings,
            system,
            component,
            descriptor: settings.descriptor(component),
            staging: PathResolver::new(settings).staging_dir(component),
        }
    }

    fn paths(&self) -> PathResolver<'a> {
        PathResolver::new(self.settings)
    }

    fn failed(&self, stage: InstallStage, reason: impl ToString) -> PixGpuError {
        install_failed(self.descriptor.name.clone(), stage, reason)
    }

    /// Locate or fetch the artifact
    pub(super) fn download(&self, gate: &mut Gate, explicit: Option<&Path>) -> Result<PathBuf> {
        let stage = InstallStage::Download;
        let artifact = match (explicit, &self.descriptor.source) {
            (Some(path), _) => {
                if !path.is_file() {
                    return Err(self.failed(stage, format!("{} does not exist", path.display())));
                }
                path.to_path_buf()
            }
            (None, ArtifactSource::Url(url)) => {
                let dest = self.staging.join(self.descriptor.artifact_file_name());
                gate.execute(
                    format!("create staging directory {}", self.staging.display()),
                    || {
                        std::fs::create_dir_all(&self.staging)
                            .map_err(|e| file_write_failed(&self.staging, e))
                    },
                )
                .map_err(|e| self.failed(stage, e))?;
                gate.execute(format!("download {url} to {}", dest.display()), || {
                    self.system.downloader.fetch(url, &dest)
                })
                .map_err(|e| self.failed(stage, e))?;

                if !gate.is_dry_run() && !dest.is_file() {
                    return Err(self.failed(stage, "artifact missing after download"));
                }
                dest
            }
            (None, ArtifactSource::Manual { file_name, page }) => {
                let path = self.settings.artifacts_dir.join(file_name);
                if !path.is_file() {
                    let reason = format!(
                        "{file_name} must be downloaded by hand from {page} into {} (or passed with --artifact)",
                        self.settings.artifacts_dir.display()
                    );
                    if !gate.is_dry_run() {
                        return Err(self.failed(stage, reason));
                    }
                    ui::warn(reason);
                }
                path
            }
        };

        if let Some(pin) = &self.descriptor.blake3 {
            if artifact.is_file() {
                verify_file(&artifact, pin).map_err(|e| self.failed(stage, e))?;
                tracing::debug!(artifact = %artifact.display(), "checksum verified");
            }
        }
        Ok(artifact)
    }

    /// Unpack into a fresh `extracted/` directory in the staging area
    pub(super) fn extract(&self, gate: &mut Gate, artifact: &Path) -> Result<PathBuf> {
        let dest = self.staging.join("extracted");
        gate.execute(
            format!("extract {} into {}", artifact.display(), dest.display()),
            || {
                if dest.symlink_metadata().is_ok() {
                    remove_path(&dest)?;
                }
                std::fs::create_dir_all(&dest).map_err(|e| file_write_failed(&dest, e))?;
                self.system
                    .extractor
                    .extract(artifact, &self.descriptor.kind, &dest)
            },
        )
        .map_err(|e| self.failed(InstallStage::Extract, e))?;
        Ok(dest)
    }

    /// Copy headers and libraries into the install layout
    pub(super) fn place(&self, gate: &mut Gate, extracted: &Path) -> Result<()> {
        let stage = InstallStage::Place;
        let layout = self.paths().layout(self.component);
        let mut backups = Backups::timestamped();

        let report = gate
            .execute(
                format!(
                    "copy {} files into {}",
                    self.descriptor.name,
                    layout.root.display()
                ),
                || self.copy_files(extracted, &mut backups),
            )
            .map_err(|e| self.failed(stage, e))?;

        let Some(report) = report else {
            return Ok(());
        };
        if report.written() + report.unchanged == 0 {
            return Err(self.failed(stage, "the artifact contains none of the expected files"));
        }
        tracing::info!(
            component = %self.component,
            files = report.files,
            links = report.links,
            unchanged = report.unchanged,
            backed_up = report.backed_up,
            "placed files"
        );
        for dir in backups.created() {
            ui::info(format!("Replaced files were moved to {}", dir.display()));
        }
        Ok(())
    }

    fn copy_files(&self, extracted: &Path, backups: &mut Backups) -> Result<CopyReport> {
        let layout = self.paths().layout(self.component);
        if self.component == Component::Cuda {
            return copy_tree(extracted, &layout.root, backups);
        }

        let mut report = copy_matching(
            &extracted.join("include"),
            &self.descriptor.headers,
            &layout.include_dir,
            backups,
        )?;
        let lib_src = ARCHIVE_LIB_DIRS
            .iter()
            .map(|dir| extracted.join(dir))
            .find(|dir| dir.is_dir())
            .unwrap_or_else(|| extracted.join("lib"));
        report.merge(copy_matching(
            &lib_src,
            &self.descriptor.libraries,
            &layout.lib_dir,
            backups,
        )?);
        Ok(report)
    }

    /// Register the libraries with the linker and the shell
    pub(super) fn link(&self, gate: &mut Gate) -> Result<()> {
        let stage = InstallStage::Link;
        let paths = self.paths();
        let layout = paths.layout(self.component);

        if self.component == Component::Cuda {
            let conf = paths.linker_conf(&self.descriptor.version);
            let line = format!("{}\n", layout.lib_dir.display());
            gate.execute(
                format!("write {} listing {}", conf.display(), layout.lib_dir.display()),
                || atomic_write(&conf, line.as_bytes()),
            )
            .map_err(|e| self.failed(stage, e))?;
        }

        if self.component == Component::Cudnn {
            let report =
                symlinks::normalize(&layout.lib_dir, gate).map_err(|e| self.failed(stage, e))?;
            if report.changed() > 0 {
                ui::info(format!(
                    "Repaired {} library alias(es) in {}",
                    report.changed(),
                    layout.lib_dir.display()
                ));
            }
        }

        refresh_linker(self.system, gate);

        if self.component == Component::Cuda {
            let editor = ProfileEditor::new(paths.profile(), &self.settings.marker);
            let text = cuda_exports(&layout.root, &layout.lib_dir, &self.settings.feature_flag);
            let changed = gate
                .execute(
                    format!("add the {} block to {}", self.settings.marker, editor.path().display()),
                    || editor.ensure_block(&text),
                )
                .map_err(|e| self.failed(stage, e))?;
            if changed == Some(false) {
                ui::info(format!(
                    "{} already has a {} block; left as is",
                    editor.path().display(),
                    self.settings.marker
                ));
            }
        }
        Ok(())
    }
}
