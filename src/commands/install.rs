//! Install command

use std::path::Path;

use crate::cli::InstallArgs;
use crate::config::Component;
use crate::error::{Result, precondition_not_met};
use crate::operations::install::{clean_staging, install, install_all};
use crate::operations::{ActionOutcome, Context};
use crate::ui;
use crate::ui::display::display_outcomes;

pub fn run(ctx: &mut Context, args: InstallArgs) -> Result<()> {
    match args.target.component() {
        Some(component) => install_component(ctx, component, args.artifact.as_deref()),
        None => {
            if args.artifact.is_some() {
                return Err(precondition_not_met(
                    "--artifact names one archive; choose cuda, cudnn or tensorflow instead of all",
                ));
            }
            install_everything(ctx)
        }
    }
}

/// Install one component and drop its staging directory once it is in place
pub fn install_component(
    ctx: &mut Context,
    component: Component,
    artifact: Option<&Path>,
) -> Result<()> {
    if install(ctx, component, artifact)? == ActionOutcome::Completed {
        clean_staging(ctx, component)?;
    }
    Ok(())
}

pub fn install_everything(ctx: &mut Context) -> Result<()> {
    let outcomes = install_all(ctx)?;
    for (component, outcome) in &outcomes {
        if *outcome == ActionOutcome::Completed {
            clean_staging(ctx, *component)?;
        }
    }
    ui::heading("Summary");
    display_outcomes(&outcomes);
    Ok(())
}
