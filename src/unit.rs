//! Service unit file model
//!
//! Recognizes the fields the provisioning flow cares about (description,
//! ordering dependencies, account, working directory, environment
//! assignments, start command, restart policy, install target) and renders
//! them in a fixed order so a rendered unit can be compared byte-for-byte
//! against the installed file.

use crate::error::{ConvergeError, Result};

/// Parsed service unit with recognized fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceUnit {
    pub description: Option<String>,
    /// Ordering dependencies ([Unit] After=)
    pub after: Vec<String>,
    pub user: Option<String>,
    pub working_directory: Option<String>,
    /// Environment variable assignments, one `KEY=VALUE` per entry
    pub environment: Vec<String>,
    pub exec_start: Option<String>,
    pub restart: Option<String>,
    /// Install target ([Install] WantedBy=)
    pub wanted_by: Vec<String>,
}

impl ServiceUnit {
    /// Parse a unit file, keeping recognized fields only
    pub fn parse(text: &str) -> Result<Self> {
        let mut unit = Self::default();
        let mut section = String::new();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                section = line[1..line.len() - 1].to_string();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConvergeError::InvalidUnit {
                    message: format!("line without assignment: {line}"),
                });
            };
            let key = key.trim();
            let value = value.trim();
            match (section.as_str(), key) {
                ("Unit", "Description") => unit.description = Some(value.to_string()),
                ("Unit", "After") => {
                    unit.after.extend(value.split_whitespace().map(str::to_string));
                }
                ("Service", "User") => unit.user = Some(value.to_string()),
                ("Service", "WorkingDirectory") => {
                    unit.working_directory = Some(value.to_string());
                }
                ("Service", "Environment") => unit.environment.push(value.to_string()),
                ("Service", "ExecStart") => unit.exec_start = Some(value.to_string()),
                ("Service", "Restart") => unit.restart = Some(value.to_string()),
                ("Install", "WantedBy") => {
                    unit.wanted_by.extend(value.split_whitespace().map(str::to_string));
                }
                _ => {}
            }
        }

        if unit.exec_start.is_none() {
            return Err(ConvergeError::InvalidUnit {
                message: "missing ExecStart".to_string(),
            });
        }
        Ok(unit)
    }

    /// Render the unit with sections and fields in a fixed order
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("[Unit]\n");
        if let Some(ref description) = self.description {
            out.push_str(&format!("Description={description}\n"));
        }
        if !self.after.is_empty() {
            out.push_str(&format!("After={}\n", self.after.join(" ")));
        }

        out.push_str("\n[Service]\n");
        if let Some(ref user) = self.user {
            out.push_str(&format!("User={user}\n"));
        }
        if let Some(ref dir) = self.working_directory {
            out.push_str(&format!("WorkingDirectory={dir}\n"));
        }
        for env in &self.environment {
            out.push_str(&format!("Environment={env}\n"));
        }
        if let Some(ref exec) = self.exec_start {
            out.push_str(&format!("ExecStart={exec}\n"));
        }
        if let Some(ref restart) = self.restart {
            out.push_str(&format!("Restart={restart}\n"));
        }

        if !self.wanted_by.is_empty() {
            out.push_str("\n[Install]\n");
            out.push_str(&format!("WantedBy={}\n", self.wanted_by.join(" ")));
        }

        out
    }
}
