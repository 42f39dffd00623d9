//! Root privilege handling
//!
//! Actions write below `/usr/local` and `/etc`, so a live run needs root.
//! When started as a normal user pixgpu runs itself again under `sudo` and
//! exits with the child's status.

use std::ffi::OsString;
use std::process::Command;

use crate::common::fs::current_uid;
use crate::error::{PixGpuError, Result};

pub fn is_root() -> Result<bool> {
    Ok(current_uid()? == 0)
}

/// Arguments for the elevated run: ours, then `extra`
pub fn sudo_args(args: impl IntoIterator<Item = OsString>, extra: &[OsString]) -> Vec<OsString> {
    args.into_iter().chain(extra.iter().cloned()).collect()
}

/// Run this executable again under sudo and return its exit code
pub fn reexec_with_sudo(extra: &[OsString]) -> Result<i32> {
    let exe = std::env::current_exe().map_err(|e| PixGpuError::PrivilegeEscalationFailed {
        reason: format!("cannot locate the pixgpu executable: {e}"),
    })?;
    let args = sudo_args(std::env::args_os().skip(1), extra);
    tracing::info!(exe = %exe.display(), ?args, "re-executing under sudo");

    let status = Command::new("sudo")
        .arg(&exe)
        .args(&args)
        .status()
        .map_err(|e| PixGpuError::PrivilegeEscalationFailed {
            reason: e.to_string(),
        })?;
    status
        .code()
        .ok_or_else(|| PixGpuError::PrivilegeEscalationFailed {
            reason: "sudo was terminated by a signal".to_string(),
        })
}
