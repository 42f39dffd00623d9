//! User-facing output
//!
//! Every message carries a severity label so informational lines, warnings
//! and errors stay distinguishable when colors are off (piped output, logs).
//! Each line is mirrored as a debug-level tracing event, so the default
//! WARN filter never prints it a second time.

pub mod display;

use std::fmt::Display;

use console::Style;
use miette::Diagnostic;

use crate::error::PixGpuError;

pub const INFO_LABEL: &str = "[INFO]";
pub const WARN_LABEL: &str = "[WARN]";
pub const ERROR_LABEL: &str = "[ERROR]";
pub const OK_LABEL: &str = "[OK]";
pub const DRY_RUN_LABEL: &str = "[DRY RUN]";

pub fn info(message: impl Display) {
    println!("{} {message}", Style::new().cyan().bold().apply_to(INFO_LABEL));
    tracing::debug!(severity = "info", "{message}");
}

pub fn success(message: impl Display) {
    println!("{} {message}", Style::new().green().bold().apply_to(OK_LABEL));
    tracing::debug!(severity = "ok", "{message}");
}

pub fn warn(message: impl Display) {
    eprintln!("{} {message}", Style::new().yellow().bold().apply_to(WARN_LABEL));
    tracing::debug!(severity = "warn", "{message}");
}

pub fn error(message: impl Display) {
    eprintln!("{} {message}", Style::new().red().bold().apply_to(ERROR_LABEL));
    tracing::debug!(severity = "error", "{message}");
}

/// An error with its help text, if it has one
pub fn report(err: &PixGpuError) {
    error(err);
    if let Some(help) = err.help() {
        info(help);
    }
}

/// A mutation that dry-run mode skipped
pub fn dry_run(message: impl Display) {
    println!("{} {message}", Style::new().magenta().bold().apply_to(DRY_RUN_LABEL));
}

pub fn heading(title: impl Display) {
    println!("\n{}", Style::new().bold().underlined().apply_to(title));
}
