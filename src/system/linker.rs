//! Dynamic linker cache through ldconfig

use std::process::Command;
use std::time::Duration;

use super::LinkerCache;
use super::exec;
use crate::error::Result;

pub struct Ldconfig {
    timeout: Duration,
}

impl Ldconfig {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl LinkerCache for Ldconfig {
    fn list(&self) -> Result<String> {
        exec::run_checked(Command::new("ldconfig").arg("-p"), self.timeout).map(|o| o.stdout)
    }

    fn refresh(&self) -> Result<()> {
        exec::run_checked(&mut Command::new("ldconfig"), self.timeout).map(|_| ())
    }
}

/// Whether an `ldconfig -p` listing contains a library whose name starts with `name`
pub fn listing_contains(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .filter(|line| line.starts_with(char::is_whitespace))
        .filter_map(|line| line.split_whitespace().next())
        .any(|entry| entry.starts_with(name))
}
