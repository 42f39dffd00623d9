//! NVIDIA driver version through nvidia-smi

use std::process::Command;
use std::time::Duration;

use super::DriverQuery;
use super::exec;

pub struct NvidiaSmi {
    timeout: Duration,
}

impl NvidiaSmi {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// First driver version in `nvidia-smi --query-gpu=driver_version` output
pub fn parse_driver_version(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .filter(|line| line.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

impl DriverQuery for NvidiaSmi {
    fn driver_version(&self) -> Option<String> {
        if which::which("nvidia-smi").is_err() {
            tracing::debug!("nvidia-smi not on PATH");
            return None;
        }
        let output = exec::run_checked(
            Command::new("nvidia-smi").args(["--query-gpu=driver_version", "--format=csv,noheader"]),
            self.timeout,
        );
        match output {
            Ok(output) => parse_driver_version(&output.stdout),
            Err(e) => {
                tracing::debug!(error = %e, "nvidia-smi query failed");
                None
            }
        }
    }
}

/// Compare dotted numeric versions; non-numeric parts compare as zero
pub fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            a.get(i)
                .copied()
                .unwrap_or(0)
                .cmp(&b.get(i).copied().unwrap_or(0))
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(std::cmp::Ordering::Equal)
}
