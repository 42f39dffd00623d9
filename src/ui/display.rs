//! Display functions for status reports

use std::path::Path;

use console::Style;

use crate::operations::ActionOutcome;
use crate::operations::status::{BlockStatus, StatusReport};
use crate::probe::InstallState;

macro_rules! display_field {
    ($label:expr, $value:expr) => {
        println!("    {} {}", Style::new().bold().apply_to($label), $value);
    };
}

fn state_label(state: InstallState) -> String {
    let (text, style) = match state {
        InstallState::Present => ("installed", Style::new().green()),
        InstallState::Partial => ("incomplete", Style::new().yellow()),
        InstallState::Absent => ("not installed", Style::new().dim()),
    };
    style.apply_to(text).to_string()
}

fn yes_no(value: bool) -> String {
    if value {
        Style::new().green().apply_to("yes").to_string()
    } else {
        Style::new().dim().apply_to("no").to_string()
    }
}

fn path(path: &Path) -> String {
    Style::new().cyan().apply_to(path.display()).to_string()
}

/// Human readable form of `pixgpu status`
pub fn display_status(report: &StatusReport) {
    super::heading("NVIDIA driver");
    let version = report
        .driver
        .version
        .clone()
        .unwrap_or_else(|| Style::new().red().apply_to("not detected").to_string());
    display_field!("Version:", version);
    if let Some(required) = &report.driver.required {
        let verdict = match report.driver.compatible {
            Some(true) => Style::new().green().apply_to("ok"),
            Some(false) => Style::new().yellow().apply_to("too old"),
            None => Style::new().dim().apply_to("unknown"),
        };
        display_field!("Required:", format!(">= {required} ({verdict})"));
    }

    super::heading("Components");
    for component in &report.components {
        println!(
            "  {} {}: {}",
            Style::new().bold().yellow().apply_to(&component.name),
            component.version,
            state_label(component.state)
        );
        display_field!("Root:", path(&component.root));
        display_field!("Libraries:", path(&component.lib_dir));
        if let Some(registered) = component.registered {
            display_field!("In linker cache:", yes_no(registered));
        }
        if !component.packages.is_empty() {
            display_field!("Packages:", component.packages.join(", "));
        }
    }

    super::heading("Environment");
    display_field!(
        "Linker config:",
        format!(
            "{} ({})",
            path(&report.linker_conf),
            if report.linker_conf_present { "present" } else { "absent" }
        )
    );
    let block = match report.profile.block {
        BlockStatus::Present => Style::new().green().apply_to("present"),
        BlockStatus::Absent => Style::new().dim().apply_to("absent"),
        BlockStatus::Malformed => Style::new().red().apply_to("malformed"),
    };
    display_field!(
        "Profile block:",
        format!("{} in {}", block, path(&report.profile.path))
    );

    super::heading("PixInsight");
    display_field!("Installed:", yes_no(report.host_app.installed));
    display_field!("Root:", path(&report.host_app.root));
    if !report.host_app.bundled_tensorflow.is_empty() {
        display_field!(
            "Bundled TensorFlow:",
            Style::new()
                .yellow()
                .apply_to(report.host_app.bundled_tensorflow.len())
        );
    }
    display_field!("Patched:", yes_no(report.host_app.patched));
}

/// One line per component of an "everything" action
pub fn display_outcomes(outcomes: &[(crate::config::Component, ActionOutcome)]) {
    for (component, outcome) in outcomes {
        let text = match outcome {
            ActionOutcome::Completed => Style::new().green().apply_to("done"),
            ActionOutcome::AlreadyInstalled => Style::new().dim().apply_to("already installed"),
            ActionOutcome::NotInstalled => Style::new().dim().apply_to("not installed"),
            ActionOutcome::Declined => Style::new().yellow().apply_to("skipped"),
            ActionOutcome::Simulated => Style::new().magenta().apply_to("simulated"),
        };
        println!("  {component:<12} {text}");
    }
}
