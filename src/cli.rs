//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Converge - idempotent device provisioning
///
/// Bring a bare device to its configured state and keep re-runs side-effect
/// free: every resource is checked before it is touched.
#[derive(Parser, Debug)]
#[command(
    name = "converge",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Idempotent provisioning tool for a single device",
    long_about = "Converge reads a provisioning manifest and converges the device toward it: \
                  packages, audio configuration, drivers, model downloads, toolchains, \
                  restored configuration and service units. Resources already in their \
                  desired state are never touched, so re-running is always safe.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  converge apply\n    \
                  converge apply --dry-run\n    \
                  converge status --json\n    \
                  converge apply --config ./device.yaml --user alice"
)]
pub struct Cli {
    /// Manifest path (defaults to converge.yaml in the current directory)
    #[arg(long, short = 'c', global = true, default_value = "converge.yaml")]
    pub config: PathBuf,

    /// Acting user override (otherwise inferred from the session)
    #[arg(long, short = 'u', global = true, env = "CONVERGE_USER")]
    pub user: Option<String>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converge the device toward the manifest
    Apply(ApplyArgs),

    /// Report which resources are converged and which are pending
    Status(StatusArgs),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the apply command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Converge everything:\n    converge apply\n\n\
                  Show what would change without touching the host:\n    converge apply --dry-run\n\n\
                  Machine-readable summary:\n    converge apply --json")]
pub struct ApplyArgs {
    /// Evaluate detection predicates only; mutate nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Human-readable status:\n    converge status\n\n\
                  Machine-readable status:\n    converge status --json")]
pub struct StatusArgs {
    /// Print resource states as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    converge completions --shell bash > ~/.bash_completion.d/converge\n\n\
                  Generate zsh completions:\n    converge completions --shell zsh > ~/.zfunc/_converge\n\n\
                  Generate fish completions:\n    converge completions --shell fish > ~/.config/fish/completions/converge.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long, short = 's')]
    pub shell: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply_dry_run() {
        let cli = Cli::parse_from(["converge", "apply", "--dry-run"]);
        match cli.command {
            Commands::Apply(args) => assert!(args.dry_run),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["converge", "--config", "/tmp/m.yaml", "status"]);
        assert_eq!(cli.config, PathBuf::from("/tmp/m.yaml"));
    }

    #[test]
    fn test_user_override_flag() {
        let cli = Cli::parse_from(["converge", "status", "--user", "alice"]);
        assert_eq!(cli.user.as_deref(), Some("alice"));
    }
}
