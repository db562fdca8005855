//! Error types and handling for Converge
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for Converge operations
#[derive(Error, Diagnostic, Debug)]
pub enum ConvergeError {
    // Environment resolution errors
    #[error("Could not determine the acting user")]
    #[diagnostic(
        code(converge::env::no_user),
        help("Pass --user <name> or run from a login session with USER set")
    )]
    NoActingUser,

    #[error("Refusing to provision as the superuser")]
    #[diagnostic(
        code(converge::env::running_as_root),
        help("Run as the device's regular account; privileged steps escalate through sudo")
    )]
    RunningAsRoot,

    #[error("No home directory for user '{user}'")]
    #[diagnostic(code(converge::env::no_home))]
    NoHomeDirectory { user: String },

    // Manifest errors
    #[error("Manifest not found at: {path}")]
    #[diagnostic(
        code(converge::manifest::not_found),
        help("Create a converge.yaml or pass --config <path>")
    )]
    ManifestNotFound { path: String },

    #[error("Failed to parse manifest: {reason}")]
    #[diagnostic(code(converge::manifest::parse_failed))]
    ManifestParseFailed { reason: String },

    #[error("Invalid manifest: {message}")]
    #[diagnostic(code(converge::manifest::invalid))]
    ManifestInvalid { message: String },

    // Resource convergence errors
    #[error("Apply failed for resource '{resource}': {reason}")]
    #[diagnostic(code(converge::resource::apply_failed))]
    ApplyFailed { resource: String, reason: String },

    #[error("Resource '{resource}' did not converge: desired state still absent after apply")]
    #[diagnostic(
        code(converge::resource::not_converged),
        help("The apply action ran but its detection predicate still reports the state missing")
    )]
    NotConverged { resource: String },

    #[error("Command '{command}' exited with status {status}")]
    #[diagnostic(code(converge::resource::command_failed))]
    CommandFailed { command: String, status: i32 },

    #[error("Failed to spawn command '{command}': {reason}")]
    #[diagnostic(code(converge::resource::spawn_failed))]
    SpawnFailed { command: String, reason: String },

    // Readiness errors
    #[error("Service '{target}' not ready after {attempts} probes")]
    #[diagnostic(
        code(converge::readiness::timeout),
        help("The service may still come up on its own; this is reported as a warning")
    )]
    ReadinessTimeout { target: String, attempts: u32 },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(converge::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(converge::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(converge::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(converge::fs::io_error))]
    IoError { message: String },

    // Unit file errors
    #[error("Invalid service unit: {message}")]
    #[diagnostic(code(converge::unit::invalid))]
    InvalidUnit { message: String },
}

impl From<std::io::Error> for ConvergeError {
    fn from(err: std::io::Error) -> Self {
        ConvergeError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ConvergeError {
    fn from(err: serde_yaml::Error) -> Self {
        ConvergeError::ManifestParseFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConvergeError {
    fn from(err: serde_json::Error) -> Self {
        ConvergeError::ManifestParseFailed {
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, ConvergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvergeError::ReadinessTimeout {
            target: "127.0.0.1:10200".to_string(),
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "Service '127.0.0.1:10200' not ready after 5 probes"
        );
    }

    #[test]
    fn test_error_code() {
        let err = ConvergeError::RunningAsRoot;
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("converge::env::running_as_root".to_string())
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ConvergeError = io_err.into();
        assert!(matches!(err, ConvergeError::IoError { .. }));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: yaml: content: [unclosed";
        let parse_result: std::result::Result<serde_yaml::Value, _> =
            serde_yaml::from_str(yaml_str);
        let yaml_err = parse_result.unwrap_err();
        let err: ConvergeError = yaml_err.into();
        assert!(matches!(err, ConvergeError::ManifestParseFailed { .. }));
    }

    #[test]
    fn test_not_converged_display() {
        let err = ConvergeError::NotConverged {
            resource: "voice-assets".to_string(),
        };
        assert!(err.to_string().contains("voice-assets"));
        assert!(err.to_string().contains("did not converge"));
    }

    #[test]
    fn test_command_failed_display() {
        let err = ConvergeError::CommandFailed {
            command: "apt-get install".to_string(),
            status: 100,
        };
        assert!(err.to_string().contains("apt-get install"));
        assert!(err.to_string().contains("100"));
    }
}
