//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::json;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own temporary repository directory holding `manifest.yaml`.
pub struct TestEnv {
  pub temp: TempDir,
  pub manifest_path: PathBuf,
}

impl TestEnv {
  /// Create a repository whose manifest has the given content.
  pub fn with_manifest(content: &str) -> Self {
    let env = Self::empty();
    std::fs::write(&env.manifest_path, content).unwrap();
    env
  }

  /// Create a repository without a manifest.
  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    let manifest_path = temp.path().join("manifest.yaml");
    Self { temp, manifest_path }
  }

  /// Write a file relative to the temp directory and return its path.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Raw manifest text.
  pub fn manifest_text(&self) -> String {
    std::fs::read_to_string(&self.manifest_path).unwrap()
  }

  /// Parsed manifest document.
  pub fn manifest(&self) -> serde_yaml::Value {
    serde_yaml::from_str(&self.manifest_text()).unwrap()
  }

  /// Get a pre-configured Command for the update-manifest binary.
  ///
  /// The repository path is already set as the first argument, and the
  /// config environment variable is cleared so the host cannot leak in.
  pub fn cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("update-manifest");
    cmd.env_remove("MANIFEST_UPDATER_CONFIG");
    cmd.env("RUST_LOG", "warn");
    cmd.arg(self.temp.path());
    cmd
  }
}

/// A single valid package update payload.
pub fn package_payload(group: &str, version: &str, package_id: &str, checksum: &str) -> serde_json::Value {
  json!({
    "package_updates": {
      group: {
        version: {
          "checksum_sha256": checksum,
          "package_id": package_id,
          "build_date": "2024-01-01",
          "build": "7",
          "category": "runtime",
          "tag": null
        }
      }
    }
  })
}
