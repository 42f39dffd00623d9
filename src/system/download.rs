//! Artifact downloads through wget

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use super::Downloader;
use super::exec;
use crate::error::{Result, command_failed};

/// Seconds wget waits on a stalled connection before retrying
const STALL_TIMEOUT_SECS: u64 = 60;
const TRIES: u32 = 3;

pub struct Wget {
    timeout: Duration,
}

impl Wget {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Downloader for Wget {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| command_failed("wget", e))?;
        }
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        let spinner = crate::progress::spinner(format!("Downloading {file_name}"));

        let mut command = Command::new("wget");
        command
            .arg("--continue")
            .arg("--no-verbose")
            .arg(format!("--timeout={STALL_TIMEOUT_SECS}"))
            .arg(format!("--tries={TRIES}"))
            .arg("--output-document")
            .arg(dest)
            .arg(url);
        let result = exec::run_checked(&mut command, self.timeout);

        match &result {
            Ok(_) => spinner.finish_with_message(format!("Downloaded {file_name}")),
            Err(_) => spinner.abandon(),
        }
        result.map(|_| ())
    }
}
