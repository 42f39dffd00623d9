//! Install actions
//!
//! An install walks `download → extract → place → link`. It is skipped when
//! the component is already present, so running it twice downloads and
//! copies nothing the second time. The staging area is left in place; callers
//! remove it with [`clean_staging`] once they are done.

mod stages;

use std::path::Path;

use super::{ActionOutcome, Context};
use crate::common::fs::remove_path;
use crate::config::{Component, Settings};
use crate::error::{PixGpuError, Result, precondition_not_met};
use crate::gate::Gate;
use crate::paths::PathResolver;
use crate::probe::{DriverCompatibility, InstallState, Prober};
use crate::progress::StageProgress;
use crate::ui;

use stages::Installation;

/// Install one component. `artifact` overrides where the artifact is taken
/// from.
pub fn install(
    ctx: &mut Context,
    component: Component,
    artifact: Option<&Path>,
) -> Result<ActionOutcome> {
    install_assuming(ctx, component, artifact, &[])
}

/// Install CUDA, cuDNN and TensorFlow in that order. Stops at the first error
/// or declined component.
pub fn install_all(ctx: &mut Context) -> Result<Vec<(Component, ActionOutcome)>> {
    let mut outcomes = Vec::new();
    let mut simulated = Vec::new();
    for component in Component::INSTALL_ORDER {
        let outcome = install_assuming(ctx, component, None, &simulated)?;
        outcomes.push((component, outcome));
        match outcome {
            ActionOutcome::Declined => break,
            ActionOutcome::Simulated => simulated.push(component),
            _ => {}
        }
    }
    Ok(outcomes)
}

/// `simulated` lists components a dry run has already pretended to install
fn install_assuming(
    ctx: &mut Context,
    component: Component,
    artifact: Option<&Path>,
    simulated: &[Component],
) -> Result<ActionOutcome> {
    let Context {
        settings,
        system,
        gate,
    } = ctx;
    let (settings, system) = (&*settings, &*system);
    let descriptor = settings.descriptor(component);
    let prober = Prober::new(settings, system);

    match prober.component_state(component)? {
        InstallState::Present => {
            ui::success(format!(
                "{} {} is already installed",
                descriptor.name, descriptor.version
            ));
            return Ok(ActionOutcome::AlreadyInstalled);
        }
        InstallState::Partial => ui::warn(format!(
            "Found an incomplete {} installation; missing files will be added",
            descriptor.name
        )),
        InstallState::Absent => {}
    }

    if !check_preconditions(settings, &prober, gate, component, simulated)? {
        return Ok(ActionOutcome::Declined);
    }

    let root = PathResolver::new(settings).layout(component).root;
    let prompt = format!(
        "Install {} {} into {}?",
        descriptor.name,
        descriptor.version,
        root.display()
    );
    if !gate.confirm(prompt)? {
        ui::info(format!("Skipped {}", descriptor.name));
        return Ok(ActionOutcome::Declined);
    }

    let installation = Installation::new(settings, system, component);
    let progress = (!gate.is_dry_run()).then(|| StageProgress::new(&descriptor.name));
    let result = run_stages(&installation, gate, artifact, progress.as_ref());
    if let Some(progress) = &progress {
        match &result {
            Ok(()) => progress.finish(),
            Err(_) => progress.abandon(),
        }
    }
    result?;

    if gate.is_dry_run() {
        return Ok(ActionOutcome::Simulated);
    }

    if prober.component_state(component)? != InstallState::Present {
        ui::warn(format!(
            "{} was placed but still does not look complete; check {}",
            descriptor.name,
            root.display()
        ));
    } else {
        ui::success(format!(
            "{} {} installed",
            descriptor.name, descriptor.version
        ));
    }
    if component == Component::Tensorflow {
        let bundled = prober.conflicting_bundles();
        if !bundled.is_empty() {
            ui::warn(format!(
                "PixInsight bundles its own TensorFlow ({} file(s)); run 'pixgpu patch-app' to use the installed one",
                bundled.len()
            ));
        }
    }
    Ok(ActionOutcome::Completed)
}

fn run_stages(
    installation: &Installation<'_>,
    gate: &mut Gate,
    artifact: Option<&Path>,
    progress: Option<&StageProgress>,
) -> Result<()> {
    let enter = |stage: &str| {
        if let Some(p) = progress {
            p.enter(stage);
        }
    };
    let complete = || {
        if let Some(p) = progress {
            p.complete();
        }
    };

    enter("downloading");
    let artifact = installation.download(gate, artifact)?;
    complete();

    enter("extracting");
    let extracted = installation.extract(gate, &artifact)?;
    complete();

    enter("placing files");
    installation.place(gate, &extracted)?;
    complete();

    enter("linking");
    installation.link(gate)?;
    complete();
    Ok(())
}

/// Driver and dependency checks. Returns false when the user declines to
/// go on with an old driver.
fn check_preconditions(
    settings: &Settings,
    prober: &Prober<'_>,
    gate: &mut Gate,
    component: Component,
    simulated: &[Component],
) -> Result<bool> {
    let descriptor = settings.descriptor(component);

    if let Some(required) = &descriptor.min_driver {
        match prober.driver_compatibility(required) {
            DriverCompatibility::Compatible { found } => {
                tracing::info!(found = %found, required = %required, "driver is compatible");
            }
            DriverCompatibility::Incompatible { found } => {
                ui::warn(format!(
                    "NVIDIA driver {found} is older than {required}, which {} {} expects",
                    descriptor.name, descriptor.version
                ));
                if !gate.confirm("Continue with the installed driver anyway?")? {
                    return Ok(false);
                }
            }
            DriverCompatibility::Undetermined => return Err(PixGpuError::DriverUndetermined),
        }
    }

    let ready = |c: Component| -> Result<bool> {
        Ok(simulated.contains(&c) || prober.is_component_installed(c)?)
    };
    match component {
        Component::Cuda => {}
        Component::Cudnn => {
            if !ready(Component::Cuda)? {
                let cuda = settings.descriptor(Component::Cuda);
                return Err(precondition_not_met(format!(
                    "{} needs {} {} installed first",
                    descriptor.name, cuda.name, cuda.version
                )));
            }
        }
        Component::Tensorflow => {
            for dependency in [Component::Cuda, Component::Cudnn] {
                if !ready(dependency)? {
                    ui::warn(format!(
                        "{} is not installed; TensorFlow will only use the CPU",
                        settings.descriptor(dependency).name
                    ));
                }
            }
        }
    }
    Ok(true)
}

/// Remove the staging directory of `component`
pub fn clean_staging(ctx: &mut Context, component: Component) -> Result<()> {
    let staging = PathResolver::new(&ctx.settings).staging_dir(component);
    if staging.symlink_metadata().is_err() {
        return Ok(());
    }
    ctx.gate
        .execute(format!("remove staging directory {}", staging.display()), || {
            remove_path(&staging)
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InstallStage;
    use crate::gate::Decision;
    use crate::test_fixtures::{
        Fakes, create_temp_dir, place_manual_artifact, sandbox_context, snapshot,
    };
    use std::path::PathBuf;

    const DRIVER: &str = "535.104.05";

    fn cuda_root(root: &Path) -> PathBuf {
        root.join("usr/local/cuda-12.2")
    }

    #[test]
    fn test_install_cuda_places_and_links() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);

        let outcome = install(&mut ctx, Component::Cuda, None).unwrap();

        assert_eq!(outcome, ActionOutcome::Completed);
        let root = cuda_root(temp.path());
        assert!(root.join("bin/nvcc").is_file());
        assert_eq!(
            std::fs::read_link(root.join("lib64/libcudart.so.12")).unwrap(),
            PathBuf::from("libcudart.so.12.2.140")
        );
        let conf = temp.path().join("etc/ld.so.conf.d/cuda-12-2.conf");
        assert_eq!(
            std::fs::read_to_string(conf).unwrap(),
            format!("{}\n", root.join("lib64").display())
        );
        let profile = std::fs::read_to_string(temp.path().join("home/.bashrc")).unwrap();
        assert!(profile.contains("# >>> pixgpu >>>"));
        assert!(profile.contains(&format!("export PATH={}/bin:$PATH", root.display())));
        assert!(profile.contains("export TF_FORCE_GPU_ALLOW_GROWTH=\"true\""));
        assert!(fakes.calls().contains(&"ldconfig".to_string()));
    }

    #[test]
    fn test_second_install_downloads_and_copies_nothing() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        install(&mut ctx, Component::Cuda, None).unwrap();
        let calls = fakes.calls();
        let before = snapshot(temp.path());

        let outcome = install(&mut ctx, Component::Cuda, None).unwrap();

        assert_eq!(outcome, ActionOutcome::AlreadyInstalled);
        assert_eq!(fakes.calls(), calls);
        assert_eq!(snapshot(temp.path()), before);
    }

    #[test]
    fn test_cudnn_requires_cuda() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        place_manual_artifact(&ctx.settings, Component::Cudnn);

        let err = install(&mut ctx, Component::Cudnn, None).unwrap_err();

        assert!(matches!(err, PixGpuError::PreconditionNotMet { .. }));
        assert!(fakes.calls().is_empty());
    }

    #[test]
    fn test_cudnn_after_cuda_repairs_aliases() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        place_manual_artifact(&ctx.settings, Component::Cudnn);
        install(&mut ctx, Component::Cuda, None).unwrap();

        let outcome = install(&mut ctx, Component::Cudnn, None).unwrap();

        assert_eq!(outcome, ActionOutcome::Completed);
        let root = cuda_root(temp.path());
        assert!(root.join("include/cudnn_version.h").is_file());
        assert!(!root.join("LICENSE").exists());
        assert_eq!(
            std::fs::read_link(root.join("lib64/libcudnn.so.8")).unwrap(),
            PathBuf::from("libcudnn.so.8.9.7")
        );
        assert_eq!(
            std::fs::read_link(root.join("lib64/libcudnn_ops_infer.so.8")).unwrap(),
            PathBuf::from("libcudnn_ops_infer.so.8.9.7")
        );
        let fetched_cudnn = fakes
            .calls()
            .iter()
            .any(|c| c.starts_with("fetch") && c.contains("cudnn"));
        assert!(!fetched_cudnn);
    }

    #[test]
    fn test_missing_manual_artifact_fails_at_download() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        install(&mut ctx, Component::Cuda, None).unwrap();

        let err = install(&mut ctx, Component::Cudnn, None).unwrap_err();

        match err {
            PixGpuError::InstallFailed { stage, reason, .. } => {
                assert_eq!(stage, InstallStage::Download);
                assert!(reason.contains("cudnn-linux-x86_64-8.9.7.29_cuda12-archive.tar.xz"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_artifact_is_used() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        let artifact = temp.path().join(ctx.settings.tensorflow.artifact_file_name());
        std::fs::write(&artifact, b"tf").unwrap();

        install(&mut ctx, Component::Tensorflow, Some(&artifact)).unwrap();

        assert!(!fakes.calls().iter().any(|c| c.starts_with("fetch")));
        assert!(temp.path().join("usr/local/include/tensorflow/c/c_api.h").is_file());
        assert!(temp.path().join("usr/local/lib/libtensorflow.so.2").is_symlink());
    }

    #[test]
    fn test_undetermined_driver_is_fatal() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);

        let err = install(&mut ctx, Component::Cuda, None).unwrap_err();

        assert!(matches!(err, PixGpuError::DriverUndetermined));
        assert!(fakes.calls().is_empty());
    }

    #[test]
    fn test_old_driver_asks_and_can_be_declined() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver("470.82.01").with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Deny);

        let outcome = install(&mut ctx, Component::Cuda, None).unwrap();

        assert_eq!(outcome, ActionOutcome::Declined);
        assert!(fakes.calls().is_empty());
    }

    #[test]
    fn test_old_driver_can_be_accepted() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver("470.82.01").with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);

        let outcome = install(&mut ctx, Component::Cuda, None).unwrap();
        assert_eq!(outcome, ActionOutcome::Completed);
    }

    #[test]
    fn test_dry_run_mutates_nothing() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, true, Decision::Deny);
        let before = snapshot(temp.path());

        let outcomes = install_all(&mut ctx).unwrap();

        assert_eq!(
            outcomes,
            vec![
                (Component::Cuda, ActionOutcome::Simulated),
                (Component::Cudnn, ActionOutcome::Simulated),
                (Component::Tensorflow, ActionOutcome::Simulated),
            ]
        );
        assert_eq!(snapshot(temp.path()), before);
        assert!(fakes.calls().is_empty());
        let journal = ctx.gate.journal();
        assert!(journal.iter().any(|e| e.starts_with("would execute: download")));
        assert!(journal.iter().any(|e| e.contains("cuda-12-2.conf")));
        assert!(journal.iter().any(|e| e.contains(".bashrc")));
    }

    #[test]
    fn test_checksum_mismatch_fails_at_download() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        ctx.settings.cuda.blake3 = Some(format!("blake3:{}", "0".repeat(64)));

        let err = install(&mut ctx, Component::Cuda, None).unwrap_err();

        assert!(matches!(
            err,
            PixGpuError::InstallFailed {
                stage: InstallStage::Download,
                ..
            }
        ));
        assert!(!cuda_root(temp.path()).exists());
    }

    #[test]
    fn test_unknown_archive_fails_at_extract() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER);
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);

        let err = install(&mut ctx, Component::Cuda, None).unwrap_err();

        assert!(matches!(
            err,
            PixGpuError::InstallFailed {
                stage: InstallStage::Extract,
                ..
            }
        ));
    }

    #[test]
    fn test_refresh_failure_only_warns() {
        let temp = create_temp_dir();
        let fakes = Fakes::new()
            .with_driver(DRIVER)
            .with_default_archives()
            .with_failing_refresh();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);

        let outcome = install(&mut ctx, Component::Cuda, None).unwrap();
        assert_eq!(outcome, ActionOutcome::Completed);
    }

    #[test]
    fn test_declined_install_touches_nothing() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Deny);

        let outcome = install(&mut ctx, Component::Cuda, None).unwrap();

        assert_eq!(outcome, ActionOutcome::Declined);
        assert!(fakes.calls().is_empty());
        assert!(!temp.path().join("usr").exists());
    }

    #[test]
    fn test_install_all_in_order() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        place_manual_artifact(&ctx.settings, Component::Cudnn);

        let outcomes = install_all(&mut ctx).unwrap();

        assert!(outcomes.iter().all(|(_, o)| *o == ActionOutcome::Completed));
        let extracts: Vec<String> = fakes
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("extract "))
            .collect();
        assert_eq!(extracts.len(), 3);
        assert!(extracts[0].contains("cuda_12.2.2"));
        assert!(extracts[1].contains("cudnn"));
        assert!(extracts[2].contains("libtensorflow"));
    }

    #[test]
    fn test_clean_staging() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver(DRIVER).with_default_archives();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        install(&mut ctx, Component::Cuda, None).unwrap();
        let staging = temp.path().join("staging/cuda-12.2.2");
        assert!(staging.join("extracted").is_dir());

        clean_staging(&mut ctx, Component::Cuda).unwrap();
        assert!(!staging.exists());
        clean_staging(&mut ctx, Component::Cuda).unwrap();
    }
}
