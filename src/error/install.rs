//! Installer and uninstaller errors

use super::{InstallStage, PixGpuError};

/// Creates an install error classified by stage
pub fn install_failed(
    component: impl Into<String>,
    stage: InstallStage,
    reason: impl ToString,
) -> PixGpuError {
    PixGpuError::InstallFailed {
        component: component.into(),
        stage,
        reason: reason.to_string(),
    }
}

/// Creates an uninstall error
pub fn uninstall_failed(component: impl Into<String>, reason: impl ToString) -> PixGpuError {
    PixGpuError::UninstallFailed {
        component: component.into(),
        reason: reason.to_string(),
    }
}

/// Creates a precondition-not-met error
pub fn precondition_not_met(message: impl Into<String>) -> PixGpuError {
    PixGpuError::PreconditionNotMet {
        message: message.into(),
    }
}
