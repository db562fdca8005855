//! Provisioning manifest (converge.yaml) data structures
//!
//! The manifest carries the host-specific parameters of the fixed resource
//! catalog: package names, external command argv vectors, download sources,
//! overlay rules, unit templates, and the readiness probe. The catalog order
//! itself is fixed in code, not configurable.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvergeError, Result};
use crate::overlay::OverlayRule;

/// Top-level provisioning manifest
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Expected acting user (CLI --user overrides)
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub dirs: DirLayout,

    /// Placeholder tokens appearing in templates and restored files
    #[serde(default)]
    pub tokens: TokenDefaults,

    #[serde(default)]
    pub packages: Option<PackageSetConfig>,

    /// Audio configuration overlay (e.g. ~/.asoundrc)
    #[serde(default)]
    pub audio: Option<LinePatchConfig>,

    #[serde(default)]
    pub driver: Option<DriverConfig>,

    /// Model runtime and model weights, in order
    #[serde(default)]
    pub downloads: Vec<DownloadConfig>,

    /// Runtime toolchain packages (interpreter, venv tooling)
    #[serde(default)]
    pub toolchain: Option<PackageSetConfig>,

    /// Language-level dependency installation
    #[serde(default)]
    pub deps: Option<CommandSetConfig>,

    /// Voice asset downloads
    #[serde(default)]
    pub voices: Vec<DownloadConfig>,

    /// Configuration restore from a backup tree
    #[serde(default)]
    pub restore: Option<RestoreConfig>,

    /// Runtime environment file overlay
    #[serde(default)]
    pub env_file: Option<LinePatchConfig>,

    /// Service units to install and enable
    #[serde(default)]
    pub units: Vec<UnitConfig>,

    #[serde(default)]
    pub readiness: Option<ReadinessConfig>,
}

impl Manifest {
    /// Load and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConvergeError::ManifestNotFound {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConvergeError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let manifest: Self = serde_yaml::from_str(&text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for download in self.downloads.iter().chain(self.voices.iter()) {
            if download.url.is_empty() || download.dest.is_empty() {
                return Err(ConvergeError::ManifestInvalid {
                    message: format!("download '{}' needs both url and dest", download.id),
                });
            }
        }
        for unit in &self.units {
            if !unit.name.ends_with(".service") {
                return Err(ConvergeError::ManifestInvalid {
                    message: format!("unit name '{}' must end in .service", unit.name),
                });
            }
        }
        if let Some(ref readiness) = self.readiness {
            if readiness.tcp.is_none() && readiness.command.is_empty() {
                return Err(ConvergeError::ManifestInvalid {
                    message: "readiness needs either tcp or command".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Directory layout relative to the acting user's home
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirLayout {
    pub app: String,
    pub assets: String,
    pub backup: String,
    pub units: String,
}

impl Default for DirLayout {
    fn default() -> Self {
        Self {
            app: "assistant".to_string(),
            assets: "assistant/voices".to_string(),
            backup: "backup/config".to_string(),
            units: ".config/systemd/user".to_string(),
        }
    }
}

/// Literal tokens that templates and restored files were authored with.
///
/// They are substituted whole-token with the resolved user and home.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenDefaults {
    pub user: String,
    pub home: String,
}

impl Default for TokenDefaults {
    fn default() -> Self {
        Self {
            user: "pi".to_string(),
            home: "/home/pi".to_string(),
        }
    }
}

/// A named set of packages converged through the package manager boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSetConfig {
    pub names: Vec<String>,

    /// Install argv prefix; package names are appended
    #[serde(default = "default_install_argv")]
    pub install: Vec<String>,

    /// Query argv prefix; zero exit with a name appended means installed
    #[serde(default = "default_query_argv")]
    pub query: Vec<String>,

    #[serde(default = "default_true")]
    pub fatal: bool,
}

fn default_install_argv() -> Vec<String> {
    vec![
        "sudo".to_string(),
        "apt-get".to_string(),
        "install".to_string(),
        "-y".to_string(),
    ]
}

fn default_query_argv() -> Vec<String> {
    vec!["dpkg".to_string(), "-s".to_string()]
}

fn default_true() -> bool {
    true
}

/// Check/install argv pair for language-level dependencies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSetConfig {
    /// Zero exit means already converged
    pub check: Vec<String>,
    pub install: Vec<String>,
    #[serde(default = "default_true")]
    pub fatal: bool,
}

/// Hardware driver installation with post-install device detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    pub packages: Vec<String>,

    #[serde(default = "default_install_argv")]
    pub install: Vec<String>,

    /// Device node the driver exposes once active; may require a reboot to
    /// appear, so its absence after install is a warning, not a failure
    pub device: String,
}

/// Overlay rules against one text configuration file (path relative to home)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinePatchConfig {
    pub file: String,
    pub rules: Vec<OverlayRule>,
    #[serde(default)]
    pub fatal: bool,
}

/// One remote asset keyed by (url, dest); dest is relative to home
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadConfig {
    pub id: String,
    pub url: String,
    pub dest: String,
    #[serde(default)]
    pub fatal: bool,

    /// Fetch argv template; `{url}` and `{dest}` are filled in
    #[serde(default = "default_fetch_argv")]
    pub fetch: Vec<String>,
}

fn default_fetch_argv() -> Vec<String> {
    vec![
        "curl".to_string(),
        "-fsSL".to_string(),
        "-o".to_string(),
        "{dest}".to_string(),
        "{url}".to_string(),
    ]
}

/// Backup tree copied into place, tokens substituted per file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestoreConfig {
    /// Source tree relative to home (defaults to dirs.backup when empty)
    #[serde(default)]
    pub from: String,
    /// Destination relative to home
    pub to: String,
    #[serde(default = "default_true")]
    pub fatal: bool,
}

/// A templated service unit installed into the unit directory and enabled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    /// Unit file name, e.g. assistant.service
    pub name: String,
    /// Template path relative to home
    pub template: String,
    /// Overlay rules applied after token substitution
    #[serde(default)]
    pub rules: Vec<OverlayRule>,
    /// Target whose wants-directory receives the enable symlink
    #[serde(default = "default_enable_target")]
    pub enable_target: String,
    #[serde(default = "default_true")]
    pub fatal: bool,
}

fn default_enable_target() -> String {
    "default.target".to_string()
}

/// Readiness probe for the dependent service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadinessConfig {
    /// TCP endpoint, e.g. 127.0.0.1:10200
    #[serde(default)]
    pub tcp: Option<String>,

    /// Probe argv; zero exit means ready (used when tcp is unset)
    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_attempts() -> u32 {
    30
}
