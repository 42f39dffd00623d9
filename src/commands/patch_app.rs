//! patch-app command

use crate::cli::PatchAppArgs;
use crate::error::Result;
use crate::operations::{Context, host_app};

pub fn run(ctx: &mut Context, args: PatchAppArgs) -> Result<()> {
    if args.restore {
        host_app::restore(ctx)?;
    } else {
        host_app::patch(ctx)?;
    }
    Ok(())
}
