//! Subprocess execution with a deadline
//!
//! Output is captured into anonymous temp files rather than pipes so a chatty
//! child (apt, the CUDA runfile) can never block on a full pipe while we poll.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::error::{Result, command_failed, command_timed_out};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished command
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Render a command as `program arg arg` for messages
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn capture_file() -> Result<File> {
    tempfile::tempfile().map_err(|e| command_failed("tempfile", e))
}

fn read_back(mut file: File) -> String {
    let mut buffer = String::new();
    if file.seek(SeekFrom::Start(0)).is_ok() {
        let _ = file.read_to_string(&mut buffer);
    }
    buffer
}

/// Run a command, killing it when `timeout` expires
pub fn run(command: &mut Command, timeout: Duration) -> Result<CommandOutput> {
    let name = describe(command);
    let stdout = capture_file()?;
    let stderr = capture_file()?;

    tracing::debug!(command = %name, timeout_secs = timeout.as_secs(), "spawning");

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::from(
            stdout.try_clone().map_err(|e| command_failed(&name, e))?,
        ))
        .stderr(Stdio::from(
            stderr.try_clone().map_err(|e| command_failed(&name, e))?,
        ))
        .spawn()
        .map_err(|e| command_failed(&name, e))?;

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().map_err(|e| command_failed(&name, e))? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(command = %name, "killed after timeout");
            return Err(command_timed_out(name, timeout.as_secs()));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        status,
        stdout: read_back(stdout),
        stderr: read_back(stderr),
    })
}

/// Like [`run`], but a non-zero exit is an error carrying the stderr tail
pub fn run_checked(command: &mut Command, timeout: Duration) -> Result<CommandOutput> {
    let name = describe(command);
    let output = run(command, timeout)?;
    if output.status.success() {
        return Ok(output);
    }

    let tail: Vec<&str> = output.stderr.lines().rev().take(5).collect();
    let tail: Vec<&str> = tail.into_iter().rev().collect();
    let reason = match output.status.code() {
        Some(code) if tail.is_empty() => format!("exited with status {code}"),
        Some(code) => format!("exited with status {code}: {}", tail.join(" | ")),
        None => "terminated by signal".to_string(),
    };
    Err(command_failed(name, reason))
}
