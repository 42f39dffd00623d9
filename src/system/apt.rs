//! Package database access through dpkg-query and apt-get

use std::process::Command;
use std::time::Duration;

use super::PackageManager;
use super::exec;
use crate::common::pattern::matches_any;
use crate::error::Result;

pub struct Apt {
    timeout: Duration,
}

impl Apt {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Names of fully installed packages in `dpkg-query -W -f='${Package}\t${Status}\n'` output
pub fn parse_installed(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .filter(|(_, status)| status.split_whitespace().last() == Some("installed"))
        .map(|(name, _)| name.trim().to_string())
        .collect()
}

impl PackageManager for Apt {
    fn installed(&self, patterns: &[String]) -> Result<Vec<String>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }
        let output = exec::run_checked(
            Command::new("dpkg-query").args(["-W", "-f=${Package}\t${Status}\n"]),
            self.timeout,
        )?;
        let mut names: Vec<String> = parse_installed(&output.stdout)
            .into_iter()
            .filter(|name| matches_any(patterns, name))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn purge(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let spinner = crate::progress::spinner(format!("Purging {}", packages.join(" ")));
        let result = exec::run_checked(
            Command::new("apt-get")
                .env("DEBIAN_FRONTEND", "noninteractive")
                .args(["purge", "-y"])
                .args(packages),
            self.timeout,
        );
        spinner.finish_and_clear();
        result.map(|_| ())
    }
}
