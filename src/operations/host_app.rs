//! PixInsight library patching
//!
//! PixInsight ships a CPU-only TensorFlow in `bin/lib`, which it loads before
//! anything on the linker path. Patching moves those files into a fixed
//! backup directory beside them; restoring moves them back.

use std::path::Path;

use super::{ActionOutcome, Context};
use crate::common::fs::remove_path;
use crate::config::{Component, Settings};
use crate::error::{Result, file_read_failed, file_write_failed, precondition_not_met};
use crate::gate::Gate;
use crate::paths::PathResolver;
use crate::probe::Prober;
use crate::ui;

pub const BACKUP_DIR_NAME: &str = "pixgpu-tensorflow-backup";

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if to.symlink_metadata().is_ok() {
        remove_path(to)?;
    }
    std::fs::rename(from, to).map_err(|e| file_write_failed(from, e))
}

/// Move the bundled TensorFlow libraries aside
pub fn patch(ctx: &mut Context) -> Result<ActionOutcome> {
    let Context {
        settings,
        system,
        gate,
    } = ctx;
    let (settings, system) = (&*settings, &*system);
    let prober = Prober::new(settings, system);
    let paths = PathResolver::new(settings);

    if !prober.is_host_app_installed() {
        ui::warn(format!(
            "PixInsight was not found at {}",
            paths.app_executable().display()
        ));
        return Ok(ActionOutcome::NotInstalled);
    }
    if !prober.is_component_installed(Component::Tensorflow)? {
        return Err(precondition_not_met(format!(
            "{} must be installed before PixInsight can use it",
            settings.tensorflow.name
        )));
    }

    let bundled = prober.conflicting_bundles();
    if bundled.is_empty() {
        ui::success("PixInsight does not bundle its own TensorFlow; nothing to patch");
        return Ok(ActionOutcome::Completed);
    }

    let backup_dir = paths.app_lib_dir().join(BACKUP_DIR_NAME);
    let prompt = format!(
        "Move {} bundled TensorFlow file(s) into {}?",
        bundled.len(),
        backup_dir.display()
    );
    if !gate.confirm(prompt)? {
        return Ok(ActionOutcome::Declined);
    }

    gate.execute(format!("create {}", backup_dir.display()), || {
        std::fs::create_dir_all(&backup_dir).map_err(|e| file_write_failed(&backup_dir, e))
    })?;
    for file in &bundled {
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = backup_dir.join(name);
        gate.execute(
            format!("move {} to {}", file.display(), target.display()),
            || move_file(file, &target),
        )?;
    }

    let outcome = ActionOutcome::done(gate);
    if outcome == ActionOutcome::Completed {
        ui::success(format!(
            "PixInsight will now load {} from {}",
            settings.tensorflow.name,
            paths.layout(Component::Tensorflow).lib_dir.display()
        ));
    }
    Ok(outcome)
}

/// Undo [`patch`], asking first
pub fn restore(ctx: &mut Context) -> Result<ActionOutcome> {
    let backup_dir = PathResolver::new(&ctx.settings)
        .app_lib_dir()
        .join(BACKUP_DIR_NAME);
    if !backup_dir.is_dir() {
        ui::info("No PixInsight libraries were moved aside; nothing to restore");
        return Ok(ActionOutcome::NotInstalled);
    }
    let prompt = format!(
        "Move the libraries in {} back into place?",
        backup_dir.display()
    );
    if !ctx.gate.confirm(prompt)? {
        return Ok(ActionOutcome::Declined);
    }
    let restored = restore_backups(&ctx.settings, &mut ctx.gate)?;
    ui::info(format!("Restored {restored} file(s)"));
    Ok(ActionOutcome::done(&ctx.gate))
}

/// Move every backed-up file back and drop the emptied backup directory.
/// Returns how many files were (or, in dry-run, would be) restored.
pub fn restore_backups(settings: &Settings, gate: &mut Gate) -> Result<usize> {
    let lib_dir = PathResolver::new(settings).app_lib_dir();
    let backup_dir = lib_dir.join(BACKUP_DIR_NAME);
    if !backup_dir.is_dir() {
        return Ok(0);
    }

    let mut entries: Vec<_> = std::fs::read_dir(&backup_dir)
        .map_err(|e| file_read_failed(&backup_dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for entry in &entries {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = lib_dir.join(name);
        gate.execute(format!("restore {}", target.display()), || {
            move_file(entry, &target)
        })?;
    }
    gate.execute(format!("remove {}", backup_dir.display()), || {
        std::fs::remove_dir(&backup_dir).map_err(|e| file_write_failed(&backup_dir, e))
    })?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PixGpuError;
    use crate::gate::Decision;
    use crate::test_fixtures::{Fakes, create_temp_dir, sandbox_context, snapshot, touch};

    fn install_host_app(root: &Path) {
        let bin = root.join("opt/PixInsight/bin");
        touch(&bin.join("PixInsight"));
        std::fs::create_dir_all(bin.join("lib")).unwrap();
        std::fs::write(bin.join("lib/libtensorflow.so.2"), b"bundled").unwrap();
        std::fs::write(bin.join("lib/libtensorflow_framework.so.2"), b"bundled fw").unwrap();
        touch(&bin.join("lib/libQt5Core.so.5"));
    }

    fn install_tensorflow(root: &Path) {
        touch(&root.join("usr/local/include/tensorflow/c/c_api.h"));
        touch(&root.join("usr/local/lib/libtensorflow.so.2.15.0"));
    }

    #[test]
    fn test_patch_and_restore() {
        let temp = create_temp_dir();
        let fakes = Fakes::new();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        install_host_app(temp.path());
        install_tensorflow(temp.path());
        let lib = temp.path().join("opt/PixInsight/bin/lib");
        let before = snapshot(&lib);

        assert_eq!(patch(&mut ctx).unwrap(), ActionOutcome::Completed);
        assert!(!lib.join("libtensorflow.so.2").exists());
        assert_eq!(
            std::fs::read(lib.join(BACKUP_DIR_NAME).join("libtensorflow.so.2")).unwrap(),
            b"bundled"
        );
        assert!(lib.join("libQt5Core.so.5").exists());

        assert_eq!(restore(&mut ctx).unwrap(), ActionOutcome::Completed);
        assert_eq!(snapshot(&lib), before);
    }

    #[test]
    fn test_patch_needs_tensorflow() {
        let temp = create_temp_dir();
        let fakes = Fakes::new();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        install_host_app(temp.path());

        let err = patch(&mut ctx).unwrap_err();
        assert!(matches!(err, PixGpuError::PreconditionNotMet { .. }));
    }

    #[test]
    fn test_patch_without_host_app() {
        let temp = create_temp_dir();
        let fakes = Fakes::new();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        assert_eq!(patch(&mut ctx).unwrap(), ActionOutcome::NotInstalled);
    }

    #[test]
    fn test_patch_dry_run() {
        let temp = create_temp_dir();
        let fakes = Fakes::new();
        let mut ctx = sandbox_context(temp.path(), &fakes, true, Decision::Deny);
        install_host_app(temp.path());
        install_tensorflow(temp.path());
        let before = snapshot(temp.path());

        assert_eq!(patch(&mut ctx).unwrap(), ActionOutcome::Simulated);
        assert_eq!(snapshot(temp.path()), before);
        assert_eq!(ctx.gate.journal().len(), 4);
    }

    #[test]
    fn test_restore_without_backup_is_noop() {
        let temp = create_temp_dir();
        let fakes = Fakes::new();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        assert_eq!(restore(&mut ctx).unwrap(), ActionOutcome::NotInstalled);
        assert_eq!(restore_backups(&ctx.settings, &mut ctx.gate).unwrap(), 0);
    }
}
