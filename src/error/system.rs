//! External tool errors

use super::PixGpuError;

/// Ubuntu package that ships a required tool
fn package_for(tool: &str) -> &str {
    match tool {
        "apt-get" => "apt",
        "dpkg-query" => "dpkg",
        "ldconfig" => "libc-bin",
        "nvidia-smi" => "nvidia-utils",
        other => other,
    }
}

/// Creates a missing dependency error
pub fn missing_dependency(tool: impl Into<String>) -> PixGpuError {
    let tool = tool.into();
    let package = package_for(&tool).to_string();
    PixGpuError::MissingDependency { tool, package }
}

/// Creates a command failed error
pub fn command_failed(command: impl Into<String>, reason: impl ToString) -> PixGpuError {
    PixGpuError::CommandFailed {
        command: command.into(),
        reason: reason.to_string(),
    }
}

/// Creates a command timeout error
pub fn command_timed_out(command: impl Into<String>, seconds: u64) -> PixGpuError {
    PixGpuError::CommandTimedOut {
        command: command.into(),
        seconds,
    }
}
