//! Progress display for installs and long-running external commands

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Number of install stages shown in the stage bar
pub const INSTALL_STAGES: u64 = 4;

/// Progress bar over the stages of one component install
pub struct StageProgress {
    pb: ProgressBar,
}

impl StageProgress {
    pub fn new(component_name: &str) -> Self {
        let style = ProgressStyle::default_bar()
            .template("[{bar:20.cyan/blue}] {pos}/{len} {prefix}: {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let pb = ProgressBar::new(INSTALL_STAGES);
        pb.set_style(style);
        pb.set_prefix(component_name.to_string());
        Self { pb }
    }

    /// Show the stage being entered
    pub fn enter(&self, stage: &str) {
        self.pb.set_message(stage.to_string());
    }

    /// Mark the current stage as done
    pub fn complete(&self) {
        self.pb.inc(1);
    }

    pub fn finish(&self) {
        self.pb.finish_with_message("configured");
    }

    /// Leave the bar where it stopped
    pub fn abandon(&self) {
        self.pb.abandon();
    }
}

/// Spinner for a blocking external command
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
