//! Uninstall actions
//!
//! Removing a component that is not there is a successful no-op. Otherwise
//! the user is asked once, then files go, then packages, then the linker
//! configuration. "Remove everything" runs TensorFlow, cuDNN, CUDA, so no
//! cache entry is left pointing into a CUDA root that is about to vanish.

use std::path::PathBuf;

use super::{ActionOutcome, Context, host_app, refresh_linker};
use crate::common::fs::remove_path;
use crate::config::{Component, Settings};
use crate::error::{PixGpuError, Result, uninstall_failed};
use crate::paths::PathResolver;
use crate::probe::{InstallState, Prober};
use crate::profile::ProfileEditor;
use crate::ui;

/// Files and directories that belong to an installed component
fn removal_targets(settings: &Settings, prober: &Prober<'_>, component: Component) -> Vec<PathBuf> {
    match component {
        Component::Cuda => {
            let root = PathResolver::new(settings).layout(component).root;
            if root.symlink_metadata().is_ok() {
                vec![root]
            } else {
                Vec::new()
            }
        }
        Component::Cudnn | Component::Tensorflow => prober.component_files(component),
    }
}

pub fn uninstall(ctx: &mut Context, component: Component) -> Result<ActionOutcome> {
    let Context {
        settings,
        system,
        gate,
    } = ctx;
    let (settings, system) = (&*settings, &*system);
    let descriptor = settings.descriptor(component);
    let prober = Prober::new(settings, system);
    let failed = |e: PixGpuError| uninstall_failed(descriptor.name.clone(), e);

    if prober.component_state(component)? == InstallState::Absent {
        ui::info(format!("{} is not installed; nothing to remove", descriptor.name));
        return Ok(ActionOutcome::NotInstalled);
    }

    let paths = PathResolver::new(settings);
    // A malformed profile must fail before anything is removed
    let profile_block = if component == Component::Cuda {
        let editor = ProfileEditor::new(paths.profile(), &settings.marker);
        editor.has_block()?.then_some(editor)
    } else {
        None
    };

    let targets = removal_targets(settings, &prober, component);
    let packages = prober.installed_packages(&descriptor.packages)?;
    let prompt = format!(
        "Remove {} ({} path(s), {} package(s))?",
        descriptor.name,
        targets.len(),
        packages.len()
    );
    if !gate.confirm(prompt)? {
        ui::info(format!("Kept {}", descriptor.name));
        return Ok(ActionOutcome::Declined);
    }

    for target in &targets {
        gate.execute(format!("remove {}", target.display()), || remove_path(target))
            .map_err(failed)?;
    }

    if !packages.is_empty() {
        gate.execute(
            format!("purge packages {}", packages.join(" ")),
            || system.packages.purge(&packages),
        )
        .map_err(failed)?;
    }

    if component == Component::Cuda {
        let conf = paths.linker_conf(&descriptor.version);
        if conf.symlink_metadata().is_ok() {
            gate.execute(format!("remove {}", conf.display()), || remove_path(&conf))
                .map_err(failed)?;
        }

        if let Some(editor) = &profile_block {
            gate.execute(
                format!("remove the {} block from {}", settings.marker, editor.path().display()),
                || editor.remove_block(),
            )
            .map_err(failed)?;
        }
    }

    if component == Component::Tensorflow {
        let restored = host_app::restore_backups(settings, gate).map_err(failed)?;
        if restored > 0 {
            ui::info(format!("Restored {restored} library file(s) bundled with PixInsight"));
        }
    }

    refresh_linker(system, gate);

    let outcome = ActionOutcome::done(gate);
    if outcome == ActionOutcome::Completed {
        ui::success(format!("{} removed", descriptor.name));
    }
    Ok(outcome)
}

/// Remove TensorFlow, cuDNN and CUDA in that order, stopping at the first
/// error
pub fn uninstall_all(ctx: &mut Context) -> Result<Vec<(Component, ActionOutcome)>> {
    let mut outcomes = Vec::new();
    for component in Component::REMOVAL_ORDER {
        outcomes.push((component, uninstall(ctx, component)?));
    }
    Ok(outcomes)
}
