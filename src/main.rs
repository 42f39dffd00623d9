//! pixgpu - GPU acceleration setup for PixInsight
//!
//! Installs, verifies and removes NVIDIA CUDA, cuDNN and the TensorFlow C API
//! on an Ubuntu workstation, keeps the linker configuration and the user's
//! shell profile in step, and can point PixInsight at the installed
//! TensorFlow.

use clap::Parser;
use std::ffi::OsString;
use std::io;

mod cli;
mod commands;
mod common;
mod config;
mod error;
mod gate;
mod hash;
mod operations;
mod paths;
mod privilege;
mod probe;
mod profile;
mod progress;
mod symlinks;
mod system;
mod temp;
mod ui;

#[cfg(test)]
mod test_fixtures;

use cli::{Cli, Commands};
use config::Settings;
use config::settings::expand_home;
use error::Result;
use gate::{Confirmer, Decision, FixedAnswer, Gate, TerminalConfirmer};
use operations::Context;
use paths::PathResolver;
use system::System;

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Flags the elevated run needs but would not see: the profile resolved for
/// the invoking user, and a settings file given through the environment
fn forwarded_flags(cli: &Cli, settings: &Settings) -> Vec<OsString> {
    let mut extra = Vec::new();
    if cli.profile.is_none() {
        extra.push("--profile".into());
        extra.push(PathResolver::new(settings).profile().into_os_string());
    }
    let config_on_command_line = std::env::args_os()
        .any(|arg| arg == "--config" || arg.to_string_lossy().starts_with("--config="));
    if let (Some(config), false) = (&cli.config, config_on_command_line) {
        extra.push("--config".into());
        extra.push(config.clone().into_os_string());
    }
    extra
}

/// Returns the exit code
fn run(mut cli: Cli) -> Result<i32> {
    let command = match cli.command.take() {
        Some(Commands::Completions(args)) => {
            commands::completions::run(args)?;
            return Ok(0);
        }
        other => other,
    };

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(profile) = &cli.profile {
        settings.profile = Some(expand_home(profile));
    }
    tracing::debug!(?settings, "settings loaded");

    system::check_required_tools(&settings.required_tools)?;

    if settings.require_root && !cli.dry_run && !privilege::is_root()? {
        ui::info("Root privileges are needed; re-running with sudo");
        return privilege::reexec_with_sudo(&forwarded_flags(&cli, &settings));
    }

    let confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(FixedAnswer(Decision::Allow))
    } else {
        Box::new(TerminalConfirmer)
    };
    let gate = Gate::new(cli.dry_run, confirmer);
    let system = System::host(&settings);
    let mut ctx = Context::new(settings, system, gate);

    commands::dispatch(&mut ctx, command)?;
    Ok(0)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            ui::report(&e);
            std::process::exit(1);
        }
    }
}
