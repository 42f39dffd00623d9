//! fix-symlinks command

use std::path::Path;

use crate::cli::FixSymlinksArgs;
use crate::config::Component;
use crate::error::Result;
use crate::operations::Context;
use crate::paths::PathResolver;
use crate::symlinks::{NormalizeReport, normalize};
use crate::ui;

pub fn run(ctx: &mut Context, args: FixSymlinksArgs) -> Result<()> {
    let dir = args
        .dir
        .unwrap_or_else(|| PathResolver::new(&ctx.settings).layout(Component::Cudnn).lib_dir);
    repair(ctx, &dir)
}

/// Normalize the aliases in `dir` after asking
pub fn repair(ctx: &mut Context, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        ui::warn(format!("{} does not exist; nothing to repair", dir.display()));
        return Ok(());
    }
    if !ctx
        .gate
        .confirm(format!("Repair library symlinks in {}?", dir.display()))?
    {
        return Ok(());
    }
    let report = normalize(dir, &mut ctx.gate)?;
    summarize(&report);
    Ok(())
}

fn summarize(report: &NormalizeReport) {
    if report.changed() == 0 {
        ui::success(format!(
            "All {} library alias(es) already correct",
            report.unchanged.len()
        ));
        return;
    }
    for (label, paths) in [
        ("created", &report.created),
        ("replaced", &report.replaced),
        ("backed up and replaced", &report.backed_up),
    ] {
        for path in paths {
            ui::info(format!("{label}: {}", path.display()));
        }
    }
    ui::success(format!(
        "{} alias(es) repaired, {} already correct",
        report.changed(),
        report.unchanged.len()
    ));
}
