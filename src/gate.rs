//! Confirmation and execution gate
//!
//! Every mutating step goes through [`Gate::execute`]. In dry-run mode the
//! step is recorded and reported instead of run, so a dry run never touches
//! the filesystem or the package database. Consent is asked through a
//! pluggable [`Confirmer`].

use std::fmt::Display;
use std::io::{BufRead, IsTerminal, Write};

use inquire::Confirm;

use crate::error::{PixGpuError, Result};
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Strategy that answers yes/no questions
pub trait Confirmer {
    fn decide(&mut self, prompt: &str) -> Result<Decision>;
}

/// Asks on the terminal; an empty answer declines.
///
/// With a terminal on stdin this is an inquire prompt. With piped stdin it
/// reads one `y`/`n` line, and end of input declines.
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn decide(&mut self, prompt: &str) -> Result<Decision> {
        let allowed = if std::io::stdin().is_terminal() {
            Confirm::new(prompt)
                .with_default(false)
                .with_help_message("Press 'y' to proceed, Enter to cancel")
                .prompt()?
        } else {
            print!("{prompt} [y/N] ");
            let _ = std::io::stdout().flush();
            let answer = read_answer_line()?.unwrap_or_default();
            parse_yes(&answer)
        };
        Ok(if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        })
    }
}

/// Read one trimmed line from stdin, `None` at end of input
pub fn read_answer_line() -> Result<Option<String>> {
    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| PixGpuError::PromptFailed {
            reason: e.to_string(),
        })?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn parse_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Answers every question the same way (`--yes`, tests)
pub struct FixedAnswer(pub Decision);

impl Confirmer for FixedAnswer {
    fn decide(&mut self, prompt: &str) -> Result<Decision> {
        tracing::debug!(prompt, decision = ?self.0, "answered without asking");
        Ok(self.0)
    }
}

pub struct Gate {
    dry_run: bool,
    confirmer: Box<dyn Confirmer>,
    journal: Vec<String>,
}

impl Gate {
    pub fn new(dry_run: bool, confirmer: Box<dyn Confirmer>) -> Self {
        Self {
            dry_run,
            confirmer,
            journal: Vec::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Dry-run records collected so far
    pub fn journal(&self) -> &[String] {
        &self.journal
    }

    fn record(&mut self, entry: String) {
        tracing::info!(target: "pixgpu::dry_run", action = %entry, "skipped mutation");
        ui::dry_run(&entry);
        self.journal.push(entry);
    }

    /// Ask for consent. Dry-run answers yes so the simulation can go on.
    pub fn confirm(&mut self, prompt: impl Display) -> Result<bool> {
        let prompt = prompt.to_string();
        if self.dry_run {
            self.record(format!("would ask: {prompt}"));
            return Ok(true);
        }
        Ok(self.confirmer.decide(&prompt)? == Decision::Allow)
    }

    /// Run `f`, or record that it would have run. Returns `None` in dry-run.
    pub fn execute<T>(
        &mut self,
        action: impl Display,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<Option<T>> {
        if self.dry_run {
            self.record(format!("would execute: {action}"));
            return Ok(None);
        }
        tracing::debug!(action = %action, "executing");
        f().map(Some)
    }
}
