//! Remote asset fetch boundary
//!
//! Downloads are keyed by (URL, destination path). The fetch argv is a
//! template with `{url}` and `{dest}` placeholders, defaulting to curl. The
//! file lands in the destination directory through a temporary name and is
//! renamed into place, so a failed fetch never leaves a partial destination
//! that would satisfy the existence check on the next run.

use std::path::Path;

use crate::error::{ConvergeError, Result};
use crate::exec;

/// Fetch a remote asset to its destination path
pub fn fetch(url: &str, dest: &Path, fetch_argv: &[String]) -> Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| ConvergeError::FileWriteFailed {
        path: parent.display().to_string(),
        reason: e.to_string(),
    })?;

    let staging = tempfile::Builder::new()
        .prefix(".converge-fetch-")
        .tempfile_in(parent)
        .map_err(|e| ConvergeError::FileWriteFailed {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    let staging_path = staging.path().to_path_buf();

    let argv: Vec<String> = fetch_argv
        .iter()
        .map(|part| {
            part.replace("{url}", url)
                .replace("{dest}", &staging_path.display().to_string())
        })
        .collect();
    exec::run(&argv)?;

    staging
        .persist(dest)
        .map_err(|e| ConvergeError::FileWriteFailed {
            path: dest.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(())
}
