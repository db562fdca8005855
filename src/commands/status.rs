//! Status command implementation
//!
//! Evaluates every detection predicate in catalog order and reports which
//! resources are converged and which are pending. Never mutates the host.

use std::path::Path;

use console::Style;
use serde::Serialize;

use crate::catalog;
use crate::cli::StatusArgs;
use crate::config::Manifest;
use crate::environment;
use crate::error::Result;
use crate::resource::{ResourceDescriptor, ResourceKind};

/// Detection outcome for one resource
#[derive(Debug, Serialize)]
pub struct ResourceState {
    pub id: String,
    pub kind: ResourceKind,
    /// None when the detection predicate itself failed
    pub converged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run status command
pub fn run(config: &Path, user_override: Option<&str>, args: StatusArgs) -> Result<()> {
    let manifest = Manifest::load(config)?;
    let user = user_override.or(manifest.user.as_deref());
    let ctx = environment::resolve(user, &manifest.dirs)?;
    let resources = catalog::build(&manifest, &ctx);

    let states = collect(&resources);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    println!(
        "Provisioning status for {} ({}):",
        Style::new().bold().apply_to(&ctx.user),
        ctx.home.display()
    );
    println!();
    for state in &states {
        let marker = match state.converged {
            Some(true) => Style::new().green().apply_to("converged"),
            Some(false) => Style::new().yellow().apply_to("pending  "),
            None => Style::new().red().apply_to("error    "),
        };
        println!("  {} {}", marker, state.id);
        if let Some(ref error) = state.error {
            println!("            {}", Style::new().dim().apply_to(error));
        }
    }

    let pending = states
        .iter()
        .filter(|s| s.converged != Some(true))
        .count();
    println!();
    if pending == 0 {
        println!("{}", Style::new().green().apply_to("All resources converged."));
    } else {
        println!("{pending} resource(s) pending.");
    }
    Ok(())
}

/// Evaluate all detection predicates without side effects
pub fn collect(resources: &[ResourceDescriptor]) -> Vec<ResourceState> {
    resources
        .iter()
        .map(|descriptor| match descriptor.detect() {
            Ok(converged) => ResourceState {
                id: descriptor.id.clone(),
                kind: descriptor.kind,
                converged: Some(converged),
                error: None,
            },
            Err(e) => ResourceState {
                id: descriptor.id.clone(),
                kind: descriptor.kind,
                converged: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}
