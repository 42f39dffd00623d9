//! Interactive menu
//!
//! Shown when pixgpu runs without a subcommand. On a terminal the actions are
//! offered through an inquire selection; with piped stdin the numbered list is
//! printed and one number is read per line, and end of input quits. A failing
//! action is reported and the menu comes back.

use std::fmt;
use std::io::{IsTerminal, Write};

use console::Style;
use inquire::Select;

use super::{install, patch_app, profile, status, symlinks, uninstall};
use crate::cli::{FixSymlinksArgs, PatchAppArgs, StatusArgs};
use crate::config::Component;
use crate::error::Result;
use crate::gate::read_answer_line;
use crate::operations::Context;
use crate::privilege;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Status,
    Install(Component),
    InstallAll,
    PatchApp,
    RepairSymlinks,
    AddProfileBlock,
    RemoveProfileBlock,
    Uninstall(Component),
    UninstallAll,
    ToggleDryRun,
    Quit,
}

impl MenuItem {
    /// Every action in display order; the position is the menu number
    pub const ALL: [MenuItem; 15] = [
        MenuItem::Quit,
        MenuItem::Status,
        MenuItem::Install(Component::Cuda),
        MenuItem::Install(Component::Cudnn),
        MenuItem::Install(Component::Tensorflow),
        MenuItem::InstallAll,
        MenuItem::PatchApp,
        MenuItem::RepairSymlinks,
        MenuItem::AddProfileBlock,
        MenuItem::RemoveProfileBlock,
        MenuItem::Uninstall(Component::Tensorflow),
        MenuItem::Uninstall(Component::Cudnn),
        MenuItem::Uninstall(Component::Cuda),
        MenuItem::UninstallAll,
        MenuItem::ToggleDryRun,
    ];

    fn number(self) -> usize {
        Self::ALL
            .iter()
            .position(|item| *item == self)
            .unwrap_or_default()
    }

    fn label(self) -> String {
        let name = |c: Component| match c {
            Component::Cuda => "CUDA",
            Component::Cudnn => "cuDNN",
            Component::Tensorflow => "TensorFlow",
        };
        match self {
            MenuItem::Status => "Show status".to_string(),
            MenuItem::Install(c) => format!("Install {}", name(c)),
            MenuItem::InstallAll => "Install everything".to_string(),
            MenuItem::PatchApp => "Make PixInsight use the installed TensorFlow".to_string(),
            MenuItem::RepairSymlinks => "Repair cuDNN library symlinks".to_string(),
            MenuItem::AddProfileBlock => "Add CUDA exports to the shell profile".to_string(),
            MenuItem::RemoveProfileBlock => {
                "Remove CUDA exports from the shell profile".to_string()
            }
            MenuItem::Uninstall(c) => format!("Uninstall {}", name(c)),
            MenuItem::UninstallAll => "Uninstall everything".to_string(),
            MenuItem::ToggleDryRun => "Toggle dry-run mode".to_string(),
            MenuItem::Quit => "Quit".to_string(),
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>2}) {}", self.number(), self.label())
    }
}

/// A menu number, or `q`/`quit`
pub fn parse_choice(input: &str) -> Option<MenuItem> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
        return Some(MenuItem::Quit);
    }
    let number: usize = input.parse().ok()?;
    MenuItem::ALL.get(number).copied()
}

enum Input {
    Chosen(MenuItem),
    Invalid(String),
    End,
}

fn title(dry_run: bool) -> String {
    if dry_run {
        format!(
            "pixgpu {}",
            Style::new().magenta().bold().apply_to("(dry run)")
        )
    } else {
        "pixgpu".to_string()
    }
}

fn read_input(dry_run: bool) -> Result<Input> {
    if std::io::stdin().is_terminal() {
        let selection = Select::new(&title(dry_run), MenuItem::ALL.to_vec())
            .with_starting_cursor(1)
            .with_page_size(MenuItem::ALL.len())
            .without_filtering()
            .with_help_message("↑↓ to move, ENTER to select, ESC to quit")
            .prompt_skippable()?;
        return Ok(selection.map_or(Input::End, Input::Chosen));
    }

    ui::heading(title(dry_run));
    for item in MenuItem::ALL.iter().skip(1).chain(std::iter::once(&MenuItem::Quit)) {
        println!("  {item}");
    }
    print!("Choose an action: ");
    let _ = std::io::stdout().flush();

    Ok(match read_answer_line()? {
        None => Input::End,
        Some(line) => match parse_choice(&line) {
            Some(item) => Input::Chosen(item),
            None => Input::Invalid(line),
        },
    })
}

pub fn run(ctx: &mut Context) -> Result<()> {
    loop {
        let item = match read_input(ctx.gate.is_dry_run())? {
            Input::End => {
                println!();
                return Ok(());
            }
            Input::Invalid(line) => {
                ui::warn(format!("Unknown choice '{line}'"));
                continue;
            }
            Input::Chosen(MenuItem::Quit) => return Ok(()),
            Input::Chosen(item) => item,
        };

        tracing::debug!(item = ?item, "menu action");
        if let Err(e) = perform(ctx, item) {
            ui::report(&e);
        }
    }
}

/// Run one menu action
pub fn perform(ctx: &mut Context, item: MenuItem) -> Result<()> {
    match item {
        MenuItem::Status => status::run(ctx, StatusArgs { json: false }),
        MenuItem::Install(component) => install::install_component(ctx, component, None),
        MenuItem::InstallAll => install::install_everything(ctx),
        MenuItem::PatchApp => patch_app::run(ctx, PatchAppArgs { restore: false }),
        MenuItem::RepairSymlinks => symlinks::run(ctx, FixSymlinksArgs { dir: None }),
        MenuItem::AddProfileBlock => profile::add_block(ctx),
        MenuItem::RemoveProfileBlock => profile::remove_block(ctx),
        MenuItem::Uninstall(component) => {
            crate::operations::uninstall::uninstall(ctx, component).map(|_| ())
        }
        MenuItem::UninstallAll => uninstall::uninstall_everything(ctx),
        MenuItem::ToggleDryRun => {
            toggle_dry_run(ctx);
            Ok(())
        }
        MenuItem::Quit => Ok(()),
    }
}

fn toggle_dry_run(ctx: &mut Context) {
    let dry_run = !ctx.gate.is_dry_run();
    ctx.gate.set_dry_run(dry_run);
    if dry_run {
        ui::info("Dry-run is on; actions only report what they would change");
        return;
    }
    ui::info("Dry-run is off; actions change the system");
    if ctx.settings.require_root && !matches!(privilege::is_root(), Ok(true)) {
        ui::warn("pixgpu is not running as root; restart it with sudo before changing anything");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PixGpuError;
    use crate::gate::Decision;
    use crate::test_fixtures::{Fakes, create_temp_dir, sandbox_context, snapshot, touch};

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("0"), Some(MenuItem::Quit));
        assert_eq!(parse_choice(" q "), Some(MenuItem::Quit));
        assert_eq!(parse_choice("QUIT"), Some(MenuItem::Quit));
        assert_eq!(parse_choice("1"), Some(MenuItem::Status));
        assert_eq!(
            parse_choice("3"),
            Some(MenuItem::Install(Component::Cudnn))
        );
        assert_eq!(parse_choice("14"), Some(MenuItem::ToggleDryRun));
        assert_eq!(parse_choice("15"), None);
        assert_eq!(parse_choice("install"), None);
        assert_eq!(parse_choice(""), None);
    }

    #[test]
    fn test_menu_numbers_match_positions() {
        for (index, item) in MenuItem::ALL.iter().enumerate() {
            assert_eq!(item.number(), index);
            assert!(item.to_string().contains(&item.label()));
        }
    }

    #[test]
    fn test_toggle_dry_run() {
        let temp = create_temp_dir();
        let fakes = Fakes::new();
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);

        perform(&mut ctx, MenuItem::ToggleDryRun).unwrap();
        assert!(ctx.gate.is_dry_run());
        perform(&mut ctx, MenuItem::ToggleDryRun).unwrap();
        assert!(!ctx.gate.is_dry_run());
    }

    #[test]
    fn test_failing_action_returns_error() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_driver("535.104.05");
        let mut ctx = sandbox_context(temp.path(), &fakes, false, Decision::Allow);

        let err = perform(&mut ctx, MenuItem::Install(Component::Cudnn)).unwrap_err();

        assert!(matches!(err, PixGpuError::PreconditionNotMet { .. }));
    }

    #[test]
    fn test_dry_run_menu_actions_mutate_nothing() {
        let temp = create_temp_dir();
        let fakes = Fakes::new().with_packages(&["libcudnn8"]);
        let mut ctx = sandbox_context(temp.path(), &fakes, true, Decision::Deny);
        touch(&temp.path().join("usr/local/cuda-12.2/lib64/libcudnn.so.8.9.7"));
        let before = snapshot(temp.path());

        for item in [
            MenuItem::RepairSymlinks,
            MenuItem::AddProfileBlock,
            MenuItem::Uninstall(Component::Cudnn),
            MenuItem::UninstallAll,
        ] {
            perform(&mut ctx, item).unwrap();
        }

        assert_eq!(snapshot(temp.path()), before);
        assert!(fakes.calls().is_empty());
        assert!(!ctx.gate.journal().is_empty());
    }
}
