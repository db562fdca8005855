//! Apply command implementation
//!
//! The full provisioning run:
//! 1. Load the manifest
//! 2. Resolve the environment context (once)
//! 3. Build the ordered resource catalog
//! 4. Converge each resource through the reconciler
//! 5. Wait for the dependent service to become ready (non-fatal)
//! 6. Report the summary; exit non-zero only on a fatal failure

use std::path::Path;
use std::time::Duration;

use console::Style;

use crate::catalog;
use crate::cli::ApplyArgs;
use crate::commands::status;
use crate::config::{Manifest, ReadinessConfig};
use crate::driver::{self, Summary};
use crate::environment::{self, EnvironmentContext};
use crate::error::{ConvergeError, Result};
use crate::readiness::{self, ProbeTarget, ReadinessCheck};

/// Run apply command
pub fn run(config: &Path, user_override: Option<&str>, args: ApplyArgs) -> Result<()> {
    let manifest = Manifest::load(config)?;
    let user = user_override.or(manifest.user.as_deref());
    let ctx = environment::resolve(user, &manifest.dirs)?;
    let resources = catalog::build(&manifest, &ctx);

    if args.dry_run {
        return print_plan(&resources, args.json);
    }

    let mut summary = driver::run(&resources, !args.json);

    // The dependent service gets a bounded readiness wait; exhaustion is a
    // warning, not a failure, since it may come up later on its own.
    if summary.is_success() {
        if let Some(ref readiness) = manifest.readiness {
            let check = to_check(readiness);
            if let Err(e) = readiness::await_ready(&check) {
                summary.push_warning("service-ready", e.to_string());
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, &ctx);
    }

    match summary.fatal {
        Some(fatal) => Err(ConvergeError::ApplyFailed {
            resource: fatal.resource,
            reason: fatal.message,
        }),
        None => Ok(()),
    }
}

fn to_check(config: &ReadinessConfig) -> ReadinessCheck {
    let target = match config.tcp {
        Some(ref addr) => ProbeTarget::Tcp { addr: addr.clone() },
        None => ProbeTarget::Command {
            argv: config.command.clone(),
        },
    };
    ReadinessCheck {
        target,
        interval: Duration::from_millis(config.interval_ms),
        max_attempts: config.attempts,
    }
}

fn print_plan(resources: &[crate::resource::ResourceDescriptor], json: bool) -> Result<()> {
    let states = status::collect(resources);
    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    let pending: Vec<_> = states.iter().filter(|s| s.converged != Some(true)).collect();
    if pending.is_empty() {
        println!("Nothing to do; all resources converged.");
        return Ok(());
    }
    println!("Would apply {} resource(s):", pending.len());
    for state in pending {
        println!("  {} {}", Style::new().yellow().apply_to("apply"), state.id);
    }
    Ok(())
}

fn print_summary(summary: &Summary, ctx: &EnvironmentContext) {
    println!();
    println!(
        "Converged {} as {}:",
        ctx.home.display(),
        Style::new().bold().apply_to(&ctx.user)
    );
    println!(
        "  {} applied, {} already converged",
        Style::new().green().apply_to(summary.applied_count()),
        summary.skipped.len()
    );
    for id in &summary.applied {
        println!("    {} {}", Style::new().green().apply_to("+"), id);
    }

    if !summary.warnings.is_empty() {
        println!();
        println!(
            "{}",
            Style::new()
                .yellow()
                .bold()
                .apply_to(format!("{} warning(s):", summary.warnings.len()))
        );
        for warning in &summary.warnings {
            println!(
                "  {} {}: {}",
                Style::new().yellow().apply_to("!"),
                warning.resource,
                warning.message
            );
        }
        println!("  Remediate manually and re-run; converged resources are not repeated.");
    }

    if let Some(ref fatal) = summary.fatal {
        println!();
        println!(
            "{} {}: {}",
            Style::new().red().bold().apply_to("Fatal:"),
            fatal.resource,
            fatal.message
        );
    }
}
