//! profile command: add or remove the environment block

use crate::cli::{ProfileAction, ProfileArgs};
use crate::config::Component;
use crate::error::Result;
use crate::operations::Context;
use crate::paths::PathResolver;
use crate::profile::{ProfileEditor, cuda_exports};
use crate::ui;

pub fn run(ctx: &mut Context, args: ProfileArgs) -> Result<()> {
    match args.action {
        ProfileAction::Add => add_block(ctx),
        ProfileAction::Remove => remove_block(ctx),
    }
}

fn editor(ctx: &Context) -> ProfileEditor {
    ProfileEditor::new(PathResolver::new(&ctx.settings).profile(), &ctx.settings.marker)
}

pub fn add_block(ctx: &mut Context) -> Result<()> {
    let editor = editor(ctx);
    if editor.has_block()? {
        ui::info(format!(
            "{} already has a {} block",
            editor.path().display(),
            ctx.settings.marker
        ));
        return Ok(());
    }

    let layout = PathResolver::new(&ctx.settings).layout(Component::Cuda);
    let text = cuda_exports(&layout.root, &layout.lib_dir, &ctx.settings.feature_flag);
    let prompt = format!(
        "Add CUDA exports to {}?\n{text}",
        editor.path().display()
    );
    if !ctx.gate.confirm(prompt)? {
        return Ok(());
    }
    let changed = ctx.gate.execute(
        format!("add the {} block to {}", ctx.settings.marker, editor.path().display()),
        || editor.ensure_block(&text),
    )?;
    if changed == Some(true) {
        ui::success(format!(
            "Added the block to {}; open a new shell to pick it up",
            editor.path().display()
        ));
    }
    Ok(())
}

pub fn remove_block(ctx: &mut Context) -> Result<()> {
    let editor = editor(ctx);
    if !editor.has_block()? {
        ui::info(format!(
            "{} has no {} block",
            editor.path().display(),
            ctx.settings.marker
        ));
        return Ok(());
    }
    if !ctx.gate.confirm(format!(
        "Remove the {} block from {}?",
        ctx.settings.marker,
        editor.path().display()
    ))? {
        return Ok(());
    }
    let changed = ctx.gate.execute(
        format!(
            "remove the {} block from {}",
            ctx.settings.marker,
            editor.path().display()
        ),
        || editor.remove_block(),
    )?;
    if changed == Some(true) {
        ui::success(format!("Removed the block from {}", editor.path().display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Decision;
    use crate::test_fixtures::{Fakes, create_temp_dir, sandbox_context};

    #[test]
    fn test_add_then_remove_restores_profile() {
        let temp = create_temp_dir();
        let fakes = Fakes::new();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);
        let profile = temp.path().join("home/.bashrc");
        std::fs::create_dir_all(profile.parent().unwrap()).unwrap();
        std::fs::write(&profile, "alias ll='ls -l'\n").unwrap();

        add_block(&mut ctx).unwrap();
        add_block(&mut ctx).unwrap();
        let content = std::fs::read_to_string(&profile).unwrap();
        assert_eq!(content.matches("# >>> pixgpu >>>").count(), 1);
        assert!(content.contains("cuda-12.2/bin:$PATH"));

        remove_block(&mut ctx).unwrap();
        assert_eq!(std::fs::read_to_string(&profile).unwrap(), "alias ll='ls -l'\n");
    }

    #[test]
    fn test_add_dry_run_leaves_profile_alone() {
        let temp = create_temp_dir();
        let fakes = Fakes::new();
        let mut ctx = sandbox_context(temp.path(), &fakes, true, Decision::Deny);

        add_block(&mut ctx).unwrap();

        assert!(!temp.path().join("home/.bashrc").exists());
        assert_eq!(ctx.gate.journal().len(), 2);
    }
}
