//! Command implementations
//!
//! Each subcommand gets a `run` that turns parsed arguments into calls on
//! [`operations`](crate::operations). The menu reuses the same helpers.

pub mod completions;
pub mod install;
pub mod menu;
pub mod patch_app;
pub mod profile;
pub mod status;
pub mod symlinks;
pub mod uninstall;

use crate::cli::Commands;
use crate::error::Result;
use crate::operations::Context;

/// Run a subcommand, or the menu when none was given
pub fn dispatch(ctx: &mut Context, command: Option<Commands>) -> Result<()> {
    match command {
        None | Some(Commands::Menu) => menu::run(ctx),
        Some(Commands::Status(args)) => status::run(ctx, args),
        Some(Commands::Install(args)) => install::run(ctx, args),
        Some(Commands::Uninstall(args)) => uninstall::run(ctx, args),
        Some(Commands::FixSymlinks(args)) => symlinks::run(ctx, args),
        Some(Commands::Profile(args)) => profile::run(ctx, args),
        Some(Commands::PatchApp(args)) => patch_app::run(ctx, args),
        Some(Commands::Completions(args)) => completions::run(args),
    }
}
