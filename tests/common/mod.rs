//! Common test utilities for Converge integration tests

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// A fake device host: a temp directory standing in for the acting user's
/// home, plus stub executables for the external collaborators.
#[allow(dead_code)]
pub struct TestHost {
    /// Temporary directory
    pub temp: TempDir,
    /// Path standing in for the acting user's home
    pub home: PathBuf,
}

#[allow(dead_code)]
impl TestHost {
    /// Create a new test host
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let home = temp.path().to_path_buf();
        Self { temp, home }
    }

    /// Write a file under the fake home
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.home.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Read a file from the fake home
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.home.join(path)).expect("Failed to read file")
    }

    /// Check if a file exists under the fake home
    pub fn file_exists(&self, path: &str) -> bool {
        self.home.join(path).exists()
    }

    /// Write the manifest and return its path
    pub fn write_manifest(&self, yaml: &str) -> PathBuf {
        let path = self.home.join("converge.yaml");
        std::fs::write(&path, yaml).expect("Failed to write manifest");
        path
    }

    /// Install an executable stub script and return its absolute path
    pub fn stub_script(&self, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let bin_dir = self.home.join("stubs");
        std::fs::create_dir_all(&bin_dir).expect("Failed to create stubs directory");
        let path = bin_dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write stub");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod stub");
        path.display().to_string()
    }

    /// Command against the real binary, pinned to this host's identity
    // Temporary fix for deprecated cargo_bin - will be updated when build-dir issues are resolved
    #[allow(deprecated)]
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("converge").expect("binary builds");
        cmd.current_dir(&self.home)
            .env("USER", "tester")
            .env("HOME", &self.home)
            .env_remove("SUDO_USER")
            .env_remove("CONVERGE_USER");
        cmd
    }
}
