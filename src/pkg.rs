//! Package manager boundary
//!
//! Install and query requests go out as argv vectors with package names
//! appended; only the exit status comes back. The argv vectors live in the
//! manifest, which is also what lets the test suite point them at stubs.

use crate::error::Result;
use crate::exec;

/// Whether a single package is installed, per the query argv
pub fn package_installed(query: &[String], name: &str) -> Result<bool> {
    let mut argv = query.to_vec();
    argv.push(name.to_string());
    exec::succeeds(&argv)
}

/// Whether every package in the set is installed
pub fn all_installed(query: &[String], names: &[String]) -> Result<bool> {
    for name in names {
        if !package_installed(query, name)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Install the whole set in one invocation
pub fn install_packages(install: &[String], names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    let mut argv = install.to_vec();
    argv.extend(names.iter().cloned());
    exec::run(&argv)
}
