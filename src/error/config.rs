//! Settings file errors

use super::PixGpuError;

/// Creates a settings parse failed error
pub fn parse_failed(path: impl Into<String>, reason: impl ToString) -> PixGpuError {
    PixGpuError::ConfigParseFailed {
        path: path.into(),
        reason: reason.to_string(),
    }
}

/// Creates a settings read failed error
pub fn read_failed(path: impl Into<String>, reason: impl ToString) -> PixGpuError {
    PixGpuError::ConfigReadFailed {
        path: path.into(),
        reason: reason.to_string(),
    }
}
