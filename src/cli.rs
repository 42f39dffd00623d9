//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Component;

/// pixgpu - GPU acceleration setup for PixInsight
///
/// Installs, verifies and removes CUDA, cuDNN and the TensorFlow C API.
#[derive(Parser, Debug)]
#[command(
    name = "pixgpu",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Set up CUDA, cuDNN and TensorFlow for GPU-accelerated PixInsight",
    long_about = "pixgpu installs, verifies and removes NVIDIA CUDA, cuDNN and the TensorFlow C API \
                  on an Ubuntu workstation so that PixInsight and its plugins can use the GPU. \
                  Without a subcommand it opens an interactive menu.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  pixgpu\n    \
                  pixgpu status\n    \
                  pixgpu --dry-run install all\n    \
                  pixgpu install cudnn --artifact ~/Downloads/cudnn-linux-x86_64-8.9.7.29_cuda12-archive.tar.xz\n    \
                  pixgpu uninstall all --yes\n    \
                  pixgpu fix-symlinks /usr/local/cuda-12.2/lib64"
)]
pub struct Cli {
    /// Show what would change without changing anything
    #[arg(long, short = 'n', global = true)]
    pub dry_run: bool,

    /// Answer yes to every confirmation
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Settings file (YAML) overriding paths, versions and timeouts
    #[arg(long, global = true, env = "PIXGPU_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Shell profile receiving the environment block
    #[arg(long, global = true, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the interactive menu (default)
    Menu,

    /// Show what is installed
    Status(StatusArgs),

    /// Install a component, or all of them
    Install(InstallArgs),

    /// Remove a component, or all of them
    Uninstall(UninstallArgs),

    /// Repair versioned shared-library symlinks
    FixSymlinks(FixSymlinksArgs),

    /// Add or remove the environment block in the shell profile
    Profile(ProfileArgs),

    /// Make PixInsight load the installed TensorFlow instead of its own
    PatchApp(PatchAppArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// What an install or uninstall applies to
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Cuda,
    Cudnn,
    Tensorflow,
    All,
}

impl Target {
    /// The single component, or `None` for `all`
    pub fn component(self) -> Option<Component> {
        match self {
            Target::Cuda => Some(Component::Cuda),
            Target::Cudnn => Some(Component::Cudnn),
            Target::Tensorflow => Some(Component::Tensorflow),
            Target::All => None,
        }
    }
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Install everything (CUDA, cuDNN, TensorFlow):\n    pixgpu install all\n\n\
                  Install cuDNN from a manually downloaded archive:\n    pixgpu install cudnn --artifact ./cudnn-linux-x86_64-8.9.7.29_cuda12-archive.tar.xz\n\n\
                  Preview an install:\n    pixgpu install cuda --dry-run")]
pub struct InstallArgs {
    /// Component to install
    #[arg(value_enum)]
    pub target: Target,

    /// Use this artifact instead of downloading or looking it up
    #[arg(long, value_name = "PATH")]
    pub artifact: Option<PathBuf>,
}

/// Arguments for the uninstall command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Remove TensorFlow only:\n    pixgpu uninstall tensorflow\n\n\
                  Remove everything without confirmation:\n    pixgpu uninstall all -y")]
pub struct UninstallArgs {
    /// Component to remove
    #[arg(value_enum)]
    pub target: Target,
}

#[derive(Parser, Debug)]
pub struct FixSymlinksArgs {
    /// Library directory (defaults to the CUDA library directory)
    pub dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAction {
    Add,
    Remove,
}

#[derive(Parser, Debug)]
pub struct ProfileArgs {
    #[arg(value_enum)]
    pub action: ProfileAction,
}

#[derive(Parser, Debug)]
pub struct PatchAppArgs {
    /// Move PixInsight's own TensorFlow libraries back
    #[arg(long)]
    pub restore: bool,
}

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    pixgpu completions --shell bash > ~/.bash_completion.d/pixgpu\n\n\
                  Generate zsh completions:\n    pixgpu completions --shell zsh > ~/.zfunc/_pixgpu\n\n\
                  Generate fish completions:\n    pixgpu completions --shell fish > ~/.config/fish/completions/pixgpu.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long)]
    pub shell: String,
}
