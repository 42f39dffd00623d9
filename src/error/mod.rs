//! Error types and handling for pixgpu
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`install`]: Installer and uninstaller errors, classified by stage
//! - [`system`]: External tool and privilege errors
//! - [`config`]: Settings file errors
//! - [`fs`]: File system errors

pub mod config;
pub mod fs;
pub mod install;
pub mod system;

#[allow(unused_imports)]
pub use config::{parse_failed as config_parse_failed, read_failed as config_read_failed};
#[allow(unused_imports)]
pub use fs::{io_error, read_failed as file_read_failed, write_failed as file_write_failed};
#[allow(unused_imports)]
pub use install::{install_failed, precondition_not_met, uninstall_failed};
#[allow(unused_imports)]
pub use system::{command_failed, command_timed_out, missing_dependency};

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Stage of an install action at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Download,
    Extract,
    Place,
    Link,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::Download => "download",
            InstallStage::Extract => "extract",
            InstallStage::Place => "place",
            InstallStage::Link => "link",
        };
        f.write_str(name)
    }
}

/// Main error type for pixgpu operations
#[derive(Error, Diagnostic, Debug)]
pub enum PixGpuError {
    // Startup errors
    #[error("Required command '{tool}' was not found on PATH")]
    #[diagnostic(
        code(pixgpu::system::missing_dependency),
        help("Install it with: sudo apt-get install {package}")
    )]
    MissingDependency { tool: String, package: String },

    #[error("Failed to re-run with root privileges: {reason}")]
    #[diagnostic(
        code(pixgpu::system::privilege),
        help("Run pixgpu with sudo, or use --dry-run to preview changes without root")
    )]
    PrivilegeEscalationFailed { reason: String },

    // Precondition errors
    #[error("Precondition not met: {message}")]
    #[diagnostic(code(pixgpu::install::precondition))]
    PreconditionNotMet { message: String },

    #[error("Could not determine the NVIDIA driver version")]
    #[diagnostic(
        code(pixgpu::install::driver_undetermined),
        help(
            "Install the proprietary NVIDIA driver (e.g. 'sudo ubuntu-drivers install') and check that 'nvidia-smi' works"
        )
    )]
    DriverUndetermined,

    // Action errors
    #[error("Installing {component} failed at the {stage} stage: {reason}")]
    #[diagnostic(code(pixgpu::install::failed))]
    InstallFailed {
        component: String,
        stage: InstallStage,
        reason: String,
    },

    #[error("Uninstalling {component} failed: {reason}")]
    #[diagnostic(code(pixgpu::uninstall::failed))]
    UninstallFailed { component: String, reason: String },

    #[error("Artifact checksum mismatch for {path}")]
    #[diagnostic(
        code(pixgpu::install::checksum),
        help("Expected {expected}, found {actual}. Delete the file and download it again")
    )]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Shell profile {path} has a malformed pixgpu block: {reason}")]
    #[diagnostic(
        code(pixgpu::profile::malformed),
        help("Edit the file by hand and remove the partial block between the pixgpu markers")
    )]
    ProfileMalformed { path: String, reason: String },

    // External commands
    #[error("Command '{command}' failed: {reason}")]
    #[diagnostic(code(pixgpu::system::command_failed))]
    CommandFailed { command: String, reason: String },

    #[error("Command '{command}' did not finish within {seconds}s")]
    #[diagnostic(code(pixgpu::system::command_timed_out))]
    CommandTimedOut { command: String, seconds: u64 },

    // Configuration errors
    #[error("Failed to read settings file: {path}")]
    #[diagnostic(code(pixgpu::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse settings file: {path}: {reason}")]
    #[diagnostic(code(pixgpu::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(pixgpu::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(pixgpu::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(pixgpu::fs::io_error))]
    IoError { message: String },

    #[error("Failed to read answer: {reason}")]
    #[diagnostic(code(pixgpu::ui::prompt_failed))]
    PromptFailed { reason: String },

    #[error("Unknown shell: {shell}")]
    #[diagnostic(
        code(pixgpu::cli::unknown_shell),
        help("Supported shells: bash, elvish, fish, powershell, zsh")
    )]
    UnknownShell { shell: String },
}

impl From<std::io::Error> for PixGpuError {
    fn from(err: std::io::Error) -> Self {
        PixGpuError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for PixGpuError {
    fn from(err: serde_yaml::Error) -> Self {
        PixGpuError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PixGpuError {
    fn from(err: serde_json::Error) -> Self {
        PixGpuError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<inquire::InquireError> for PixGpuError {
    fn from(err: inquire::InquireError) -> Self {
        PixGpuError::PromptFailed {
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, PixGpuError>;
