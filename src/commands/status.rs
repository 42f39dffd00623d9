//! Status command

use crate::cli::StatusArgs;
use crate::error::Result;
use crate::operations::{Context, status};
use crate::ui::display::display_status;

pub fn run(ctx: &mut Context, args: StatusArgs) -> Result<()> {
    let report = status::collect(&ctx.settings, &ctx.system)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_status(&report);
    }
    Ok(())
}
