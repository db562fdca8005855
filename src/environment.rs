//! Environment resolution for the provisioning run
//!
//! Determines the acting user and home directory once, derives every
//! installation path from them, and hands the result around as an immutable
//! context. No other component re-reads ambient identity.

use std::path::PathBuf;

use crate::config::DirLayout;
use crate::error::{ConvergeError, Result};

/// Immutable context every component derives its paths from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentContext {
    /// Acting (non-privileged) user
    pub user: String,
    /// Home directory of the acting user
    pub home: PathBuf,
    /// Application root (installed runtime, scripts, configuration)
    pub app_root: PathBuf,
    /// Voice/model asset directory
    pub asset_dir: PathBuf,
    /// Source directory for restored configuration
    pub backup_dir: PathBuf,
    /// Directory service unit files are installed into
    pub unit_dir: PathBuf,
}

/// Resolve the acting user and derived paths.
///
/// Resolution order: explicit override, then caller-inferred identity
/// (`SUDO_USER`, `USER`, `LOGNAME`), then failure. Resolving to the
/// superuser is rejected: provisioning runs as the device's regular account
/// and escalates individual steps through sudo.
pub fn resolve(user_override: Option<&str>, dirs: &DirLayout) -> Result<EnvironmentContext> {
    resolve_with(user_override, dirs, &|name| std::env::var(name).ok())
}

/// Resolution against an explicit variable lookup (testable core)
pub fn resolve_with(
    user_override: Option<&str>,
    dirs: &DirLayout,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<EnvironmentContext> {
    let user = match user_override {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => infer_user(lookup).ok_or(ConvergeError::NoActingUser)?,
    };

    if user == "root" {
        return Err(ConvergeError::RunningAsRoot);
    }

    let home = home_for(&user, lookup)?;
    Ok(EnvironmentContext {
        app_root: home.join(&dirs.app),
        asset_dir: home.join(&dirs.assets),
        backup_dir: home.join(&dirs.backup),
        unit_dir: home.join(&dirs.units),
        user,
        home,
    })
}

fn infer_user(lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    // SUDO_USER first: under sudo, USER reports root while SUDO_USER keeps
    // the invoking account.
    for var in ["SUDO_USER", "USER", "LOGNAME"] {
        if let Some(value) = lookup(var) {
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

fn home_for(user: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<PathBuf> {
    // HOME is trusted only when it belongs to the resolved user; under sudo
    // it points at root's home.
    if lookup("USER").as_deref() == Some(user) {
        if let Some(home) = lookup("HOME").map(PathBuf::from).or_else(dirs::home_dir) {
            return Ok(home);
        }
    }
    let fallback = PathBuf::from("/home").join(user);
    if fallback.as_os_str().is_empty() {
        return Err(ConvergeError::NoHomeDirectory {
            user: user.to_string(),
        });
    }
    Ok(fallback)
}

/// Whether the current process looks like it runs as the superuser
pub fn is_superuser() -> bool {
    let env_user = std::env::var("USER").ok();
    let sudo_user = std::env::var("SUDO_USER").ok();
    match sudo_user {
        // Invoked through sudo from a regular account: the broker is
        // available but the acting user is not root.
        Some(name) if !name.is_empty() && name != "root" => false,
        _ => env_user.as_deref() == Some("root") || dirs::home_dir() == Some(PathBuf::from("/root")),
    }
}
