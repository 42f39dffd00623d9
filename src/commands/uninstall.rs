//! Uninstall command

use crate::cli::UninstallArgs;
use crate::error::Result;
use crate::operations::Context;
use crate::operations::uninstall::{uninstall, uninstall_all};
use crate::ui;
use crate::ui::display::display_outcomes;

pub fn run(ctx: &mut Context, args: UninstallArgs) -> Result<()> {
    match args.target.component() {
        Some(component) => {
            uninstall(ctx, component)?;
        }
        None => uninstall_everything(ctx)?,
    }
    Ok(())
}

pub fn uninstall_everything(ctx: &mut Context) -> Result<()> {
    let outcomes = uninstall_all(ctx)?;
    ui::heading("Summary");
    display_outcomes(&outcomes);
    Ok(())
}
