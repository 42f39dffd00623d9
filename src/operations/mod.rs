//! Actions that change the system
//!
//! Each action gets a [`Context`] holding the settings, the system
//! collaborators and the gate. Actions check state through
//! [`Prober`](crate::probe::Prober) first and route every mutation through
//! the gate, so the same code path serves live runs and dry runs.

pub mod host_app;
pub mod install;
pub mod status;
pub mod uninstall;

use crate::config::Settings;
use crate::gate::Gate;
use crate::system::System;
use crate::ui;

pub struct Context {
    pub settings: Settings,
    pub system: System,
    pub gate: Gate,
}

impl Context {
    pub fn new(settings: Settings, system: System, gate: Gate) -> Self {
        Self {
            settings,
            system,
            gate,
        }
    }
}

/// Result of an action that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    AlreadyInstalled,
    NotInstalled,
    Declined,
    /// Dry run; nothing was changed
    Simulated,
}

impl ActionOutcome {
    /// Completed, or Simulated in dry-run
    pub fn done(gate: &Gate) -> Self {
        if gate.is_dry_run() {
            ActionOutcome::Simulated
        } else {
            ActionOutcome::Completed
        }
    }
}

/// Refresh the linker cache; a failure only warns
pub(crate) fn refresh_linker(system: &System, gate: &mut Gate) {
    let result = gate.execute("refresh the dynamic linker cache (ldconfig)", || {
        system.linker.refresh()
    });
    if let Err(e) = result {
        ui::warn(format!(
            "Could not refresh the linker cache ({e}); run 'sudo ldconfig' before using the libraries"
        ));
    }
}
