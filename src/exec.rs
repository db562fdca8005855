//! Thin wrapper around external command invocation
//!
//! Every external collaborator (package manager, downloader, probes) is
//! driven through an argv vector and judged on exit status alone; no
//! tool-specific output parsing happens anywhere in the crate.

use std::process::{Command, Stdio};

use crate::error::{ConvergeError, Result};

/// Run an argv to completion, failing on non-zero exit
pub fn run(argv: &[String]) -> Result<()> {
    let status = spawn_status(argv, false)?;
    if status != 0 {
        return Err(ConvergeError::CommandFailed {
            command: argv.join(" "),
            status,
        });
    }
    Ok(())
}

/// Run an argv quietly, reporting only whether it succeeded
pub fn succeeds(argv: &[String]) -> Result<bool> {
    Ok(spawn_status(argv, true)? == 0)
}

fn spawn_status(argv: &[String], quiet: bool) -> Result<i32> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ConvergeError::SpawnFailed {
            command: String::new(),
            reason: "empty command".to_string(),
        });
    };

    let mut cmd = Command::new(program);
    cmd.args(args);
    if quiet {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let status = cmd.status().map_err(|e| ConvergeError::SpawnFailed {
        command: argv.join(" "),
        reason: e.to_string(),
    })?;
    Ok(status.code().unwrap_or(-1))
}
