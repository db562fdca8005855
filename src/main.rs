//! Converge - idempotent device provisioning
//!
//! Reads a provisioning manifest and converges a single device toward it:
//! packages, audio configuration, drivers, model downloads, toolchains,
//! restored configuration and service units. Every resource is gated by a
//! detection predicate, so re-running the tool never repeats work.

use clap::Parser;

mod catalog;
mod cli;
mod commands;
mod config;
mod driver;
mod environment;
mod error;
mod exec;
mod fetch;
mod overlay;
mod pkg;
mod progress;
mod readiness;
mod reconciler;
mod resource;
mod unit;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Mutating and probing commands must not run as root; privileged steps
    // escalate individually through sudo.
    let needs_user_session = matches!(cli.command, Commands::Apply(_) | Commands::Status(_));
    if needs_user_session && environment::is_superuser() {
        eprintln!("Error: {}", error::ConvergeError::RunningAsRoot);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Apply(args) => commands::apply::run(&cli.config, cli.user.as_deref(), args),
        Commands::Status(args) => commands::status::run(&cli.config, cli.user.as_deref(), args),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
