//! The fixed, ordered resource catalog
//!
//! Turns the manifest plus resolved environment into the declarative
//! descriptor list the driver converges. The order is dependency order and
//! is not configurable: base packages before anything needing a compiler,
//! the sound driver before anything probing the device it exposes, the
//! toolchain before language dependencies, restored configuration before
//! the units that read it.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{Manifest, RestoreConfig, UnitConfig};
use crate::environment::EnvironmentContext;
use crate::error::{ConvergeError, Result};
use crate::overlay::{self, OverlayRule};
use crate::resource::{Criticality, ResourceDescriptor, ResourceKind};
use crate::unit::ServiceUnit;
use crate::{fetch, pkg};

/// Build the ordered descriptor list for one provisioning run
pub fn build(manifest: &Manifest, ctx: &EnvironmentContext) -> Vec<ResourceDescriptor> {
    let subs = token_substitutions(manifest, ctx);
    let mut resources = Vec::new();

    if let Some(ref packages) = manifest.packages {
        resources.push(package_set(
            "base-packages",
            packages.names.clone(),
            packages.query.clone(),
            packages.install.clone(),
            Criticality::from_fatal_flag(packages.fatal),
        ));
    }

    if let Some(ref audio) = manifest.audio {
        resources.push(line_patch(
            "audio-config",
            ctx.home.join(&audio.file),
            audio.rules.clone(),
            Criticality::from_fatal_flag(audio.fatal),
        ));
    }

    if let Some(ref driver) = manifest.driver {
        // Detection probes the device node the driver exposes. A freshly
        // installed driver often needs a reboot before the node appears, so
        // this descriptor is never fatal: "not yet visible" is a warning.
        let device = driver.device.clone();
        let install = driver.install.clone();
        let names = driver.packages.clone();
        resources.push(ResourceDescriptor::new(
            "sound-driver",
            ResourceKind::PackageSet,
            Criticality::WarnAndContinue,
            move || Ok(Path::new(&device).exists()),
            move || pkg::install_packages(&install, &names),
        ));
    }

    for download in &manifest.downloads {
        resources.push(remote_download(
            format!("download-{}", download.id),
            download.url.clone(),
            ctx.home.join(&download.dest),
            download.fetch.clone(),
            Criticality::from_fatal_flag(download.fatal),
        ));
    }

    if let Some(ref toolchain) = manifest.toolchain {
        resources.push(package_set(
            "runtime-toolchain",
            toolchain.names.clone(),
            toolchain.query.clone(),
            toolchain.install.clone(),
            Criticality::from_fatal_flag(toolchain.fatal),
        ));
    }

    if let Some(ref deps) = manifest.deps {
        let check = deps.check.clone();
        let install = deps.install.clone();
        resources.push(ResourceDescriptor::new(
            "language-deps",
            ResourceKind::PackageSet,
            Criticality::from_fatal_flag(deps.fatal),
            move || crate::exec::succeeds(&check),
            move || crate::exec::run(&install),
        ));
    }

    for voice in &manifest.voices {
        resources.push(remote_download(
            format!("voice-{}", voice.id),
            voice.url.clone(),
            ctx.home.join(&voice.dest),
            voice.fetch.clone(),
            Criticality::from_fatal_flag(voice.fatal),
        ));
    }

    if let Some(ref restore) = manifest.restore {
        resources.push(restore_tree(restore, ctx));
    }

    if let Some(ref env_file) = manifest.env_file {
        resources.push(line_patch(
            "env-file",
            ctx.home.join(&env_file.file),
            env_file.rules.clone(),
            Criticality::from_fatal_flag(env_file.fatal),
        ));
    }

    for unit in &manifest.units {
        let (install, enable) = unit_resources(unit, ctx, &subs);
        resources.push(install);
        resources.push(enable);
    }

    resources
}

/// Tokens templates were authored with, mapped to resolved context values
pub fn token_substitutions(
    manifest: &Manifest,
    ctx: &EnvironmentContext,
) -> Vec<(String, String)> {
    vec![
        (
            manifest.tokens.home.clone(),
            ctx.home.display().to_string(),
        ),
        (manifest.tokens.user.clone(), ctx.user.clone()),
    ]
}

fn package_set(
    id: &str,
    names: Vec<String>,
    query: Vec<String>,
    install: Vec<String>,
    criticality: Criticality,
) -> ResourceDescriptor {
    let detect_names = names.clone();
    ResourceDescriptor::new(
        id,
        ResourceKind::PackageSet,
        criticality,
        move || pkg::all_installed(&query, &detect_names),
        move || pkg::install_packages(&install, &names),
    )
}

fn line_patch(
    id: &str,
    file: PathBuf,
    rules: Vec<OverlayRule>,
    criticality: Criticality,
) -> ResourceDescriptor {
    let detect_file = file.clone();
    let detect_rules = rules.clone();
    ResourceDescriptor::new(
        id,
        ResourceKind::LinePatch,
        criticality,
        move || Ok(!overlay::overlay_pending(&detect_file, &detect_rules)?),
        move || overlay::apply_overlay(&file, &rules).map(|_| ()),
    )
}

fn remote_download(
    id: String,
    url: String,
    dest: PathBuf,
    fetch_argv: Vec<String>,
    criticality: Criticality,
) -> ResourceDescriptor {
    // Existence-only detection; content is never verified and an existing
    // file of any content suppresses the fetch.
    let detect_dest = dest.clone();
    ResourceDescriptor::new(
        id,
        ResourceKind::RemoteDownload,
        criticality,
        move || Ok(detect_dest.exists()),
        move || fetch::fetch(&url, &dest, &fetch_argv),
    )
}

fn restore_tree(restore: &RestoreConfig, ctx: &EnvironmentContext) -> ResourceDescriptor {
    let from = if restore.from.is_empty() {
        ctx.backup_dir.clone()
    } else {
        ctx.home.join(&restore.from)
    };
    let to = ctx.home.join(&restore.to);

    let detect_from = from.clone();
    let detect_to = to.clone();
    ResourceDescriptor::new(
        "restored-config",
        ResourceKind::FileOverlay,
        Criticality::from_fatal_flag(restore.fatal),
        move || tree_restored(&detect_from, &detect_to),
        move || copy_tree(&from, &to),
    )
}

/// Every file in the backup tree already exists at the destination.
///
/// A missing backup source counts as converged: there is nothing to restore.
fn tree_restored(from: &Path, to: &Path) -> Result<bool> {
    if !from.exists() {
        return Ok(true);
    }
    for entry in relative_files(from)? {
        if !to.join(&entry).exists() {
            return Ok(false);
        }
    }
    Ok(true)
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in relative_files(from)? {
        let src = from.join(&entry);
        let dst = to.join(&entry);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConvergeError::FileWriteFailed {
                path: parent.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        std::fs::copy(&src, &dst).map_err(|e| ConvergeError::FileWriteFailed {
            path: dst.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn relative_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ConvergeError::IoError {
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| ConvergeError::IoError {
                    message: e.to_string(),
                })?;
            files.push(rel.to_path_buf());
        }
    }
    Ok(files)
}

fn unit_resources(
    unit: &UnitConfig,
    ctx: &EnvironmentContext,
    subs: &[(String, String)],
) -> (ResourceDescriptor, ResourceDescriptor) {
    let template = ctx.home.join(&unit.template);
    let dest = ctx.unit_dir.join(&unit.name);
    let rules = unit.rules.clone();
    let subs = subs.to_vec();
    let criticality = Criticality::from_fatal_flag(unit.fatal);

    let render = {
        let template = template.clone();
        move || -> Result<String> { render_unit(&template, &subs, &rules) }
    };

    let detect_render = render.clone();
    let detect_dest = dest.clone();
    let install = ResourceDescriptor::new(
        format!("unit-{}", unit.name),
        ResourceKind::TemplatedUnit,
        criticality,
        move || {
            if !detect_dest.exists() {
                return Ok(false);
            }
            let current = std::fs::read_to_string(&detect_dest).map_err(|e| {
                ConvergeError::FileReadFailed {
                    path: detect_dest.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            Ok(current == detect_render()?)
        },
        {
            let dest = dest.clone();
            move || {
                let rendered = render()?;
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ConvergeError::FileWriteFailed {
                            path: parent.display().to_string(),
                            reason: e.to_string(),
                        }
                    })?;
                }
                std::fs::write(&dest, rendered).map_err(|e| ConvergeError::FileWriteFailed {
                    path: dest.display().to_string(),
                    reason: e.to_string(),
                })
            }
        },
    );

    let link = ctx
        .unit_dir
        .join(format!("{}.wants", unit.enable_target))
        .join(&unit.name);
    let detect_link = link.clone();
    let detect_target = dest.clone();
    let enable = ResourceDescriptor::new(
        format!("enable-{}", unit.name),
        ResourceKind::Symlink,
        criticality,
        move || Ok(std::fs::read_link(&detect_link).ok().as_deref() == Some(&detect_target)),
        move || {
            if let Some(parent) = link.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ConvergeError::FileWriteFailed {
                    path: parent.display().to_string(),
                    reason: e.to_string(),
                })?;
            }
            if link.symlink_metadata().is_ok() {
                std::fs::remove_file(&link).map_err(|e| ConvergeError::FileWriteFailed {
                    path: link.display().to_string(),
                    reason: e.to_string(),
                })?;
            }
            std::os::unix::fs::symlink(&dest, &link).map_err(|e| {
                ConvergeError::FileWriteFailed {
                    path: link.display().to_string(),
                    reason: e.to_string(),
                }
            })
        },
    );

    (install, enable)
}

/// Substitute tokens, apply overlay rules, parse and canonically re-render
fn render_unit(template: &Path, subs: &[(String, String)], rules: &[OverlayRule]) -> Result<String> {
    let text = std::fs::read_to_string(template).map_err(|_| ConvergeError::FileNotFound {
        path: template.display().to_string(),
    })?;
    let substituted = overlay::substitute_tokens(&text, subs);
    let patched = overlay::overlay_text(&substituted, rules);
    Ok(ServiceUnit::parse(&patched)?.render())
}
