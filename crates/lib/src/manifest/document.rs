//! The manifest document and its on-disk lifecycle.
//!
//! # Manifest File Format
//!
//! ```yaml
//! packages:
//!   libtorrent:
//!     2.0.9:
//!       checksum_sha256: abc123
//!       build_date: '2024-01-01'
//!       build: '7'
//!       category: runtime
//!       tag: null
//!       distribution:
//!       - bookworm
//! applications:
//!   rtorrent:
//!     build_date: '2024-01-02'
//!     dependencies: [libtorrent]
//!     packages: {}
//! ```
//!
//! The document is held as a generic YAML mapping. Keys other than `packages`
//! and `applications` are carried through untouched, and no field-level
//! validation happens on load.

use std::fs;
use std::io;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{ApplicationRecord, EntryChange, PackageBuildRecord, key};

const PACKAGES_KEY: &str = "packages";
const APPLICATIONS_KEY: &str = "applications";

/// Errors that can occur when reading or writing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// The manifest file does not exist.
  #[error("manifest file not found: {path}")]
  NotFound { path: String },

  /// Failed to read the manifest file.
  #[error("failed to read manifest: {0}")]
  Read(#[source] io::Error),

  /// Failed to parse the manifest YAML.
  #[error("failed to parse manifest: {0}")]
  Parse(#[source] serde_yaml::Error),

  /// The document root is not a mapping.
  #[error("manifest root must be a mapping, found {kind}")]
  InvalidRoot { kind: &'static str },

  /// Failed to serialize the manifest.
  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_yaml::Error),

  /// Failed to write the manifest file.
  #[error("failed to write manifest: {0}")]
  Write(#[source] io::Error),
}

/// A manifest document.
///
/// Equality is structural: two manifests are equal when they hold the same
/// keys and values, regardless of key order or source formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
  root: Mapping,
}

impl Manifest {
  /// Create an empty manifest.
  pub fn new() -> Self {
    Self::default()
  }

  /// Wrap a parsed YAML document.
  ///
  /// A null document (empty file) becomes an empty manifest.
  pub fn from_value(value: Value) -> Result<Self, ManifestError> {
    match value {
      Value::Mapping(root) => Ok(Self { root }),
      Value::Null => Ok(Self::new()),
      other => Err(ManifestError::InvalidRoot {
        kind: value_kind(&other),
      }),
    }
  }

  /// Parse a manifest from YAML text.
  pub fn from_yaml_str(content: &str) -> Result<Self, ManifestError> {
    if content.trim().is_empty() {
      return Ok(Self::new());
    }
    let value: Value = serde_yaml::from_str(content).map_err(ManifestError::Parse)?;
    Self::from_value(value)
  }

  /// Load a manifest from the given path.
  ///
  /// Returns `ManifestError::NotFound` if the file doesn't exist.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    info!(path = %path.display(), "loading manifest");

    let content = fs::read_to_string(path).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        ManifestError::NotFound {
          path: path.display().to_string(),
        }
      } else {
        ManifestError::Read(e)
      }
    })?;

    let manifest = Self::from_yaml_str(&content)?;
    debug!(keys = manifest.root.len(), "manifest loaded");
    Ok(manifest)
  }

  /// Render the manifest as YAML, keeping insertion order.
  pub fn to_yaml_string(&self) -> Result<String, ManifestError> {
    serde_yaml::to_string(&self.root).map_err(ManifestError::Serialize)
  }

  /// Write the manifest to `path`.
  ///
  /// Uses atomic write (write to temp, then rename) so a failed write never
  /// leaves a truncated manifest behind.
  pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
    let content = self.to_yaml_string()?;
    let file_name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "manifest".to_string());
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&temp_path, &content).map_err(ManifestError::Write)?;
    if let Err(e) = fs::rename(&temp_path, path) {
      let _ = fs::remove_file(&temp_path);
      return Err(ManifestError::Write(e));
    }
    Ok(())
  }

  /// The raw document root.
  pub fn as_mapping(&self) -> &Mapping {
    &self.root
  }

  /// Look up a top-level value.
  pub fn get(&self, name: &str) -> Option<&Value> {
    self.root.get(name)
  }

  /// Read back a package record, if present and well-formed.
  pub fn package(&self, package_id: &str, version: &str) -> Option<PackageBuildRecord> {
    let value = self.get(PACKAGES_KEY)?.get(package_id)?.get(version)?;
    serde_yaml::from_value(value.clone()).ok()
  }

  /// Read back an application record, if present and well-formed.
  pub fn application(&self, application_id: &str) -> Option<ApplicationRecord> {
    let value = self.get(APPLICATIONS_KEY)?.get(application_id)?;
    serde_yaml::from_value(value.clone()).ok()
  }

  /// Set `packages[package_id][version]` to `record`.
  ///
  /// The previous record for that version, if any, is replaced wholesale.
  /// Missing (or non-mapping) `packages` and `packages[package_id]` entries
  /// are created as empty mappings first.
  pub fn update_package_entry(&mut self, package_id: &str, version: &str, record: &PackageBuildRecord) -> EntryChange {
    debug!(package = %package_id, version = %version, build = %record.build, "updating package entry");

    let packages = ensure_mapping(&mut self.root, PACKAGES_KEY);
    let versions = ensure_mapping(packages, package_id);

    let value = record.to_value();
    let previous = versions.insert(key(version), value.clone());
    let change = EntryChange::classify(previous.as_ref(), &value);

    info!(package = %package_id, version = %version, change = ?change, "package entry written");
    change
  }

  /// Set `applications[application_id]` to `record`, replacing any previous record.
  pub fn update_application_entry(&mut self, application_id: &str, record: &ApplicationRecord) -> EntryChange {
    let applications = ensure_mapping(&mut self.root, APPLICATIONS_KEY);

    let value = record.to_value();
    let previous = applications.insert(key(application_id), value.clone());
    let change = EntryChange::classify(previous.as_ref(), &value);

    info!(application = %application_id, change = ?change, "application entry written");
    change
  }
}

/// Write `updated` to `path` only if it differs from `original`.
///
/// Returns `true` when the file was written.
pub fn save_if_changed(original: &Manifest, updated: &Manifest, path: &Path) -> Result<bool, ManifestError> {
  if original == updated {
    info!(path = %path.display(), "no changes detected, skipping save");
    return Ok(false);
  }

  info!(path = %path.display(), "changes detected, writing manifest");
  updated.save(path)?;
  Ok(true)
}

/// Get `parent[name]` as a mutable mapping, creating or replacing it as needed.
fn ensure_mapping<'a>(parent: &'a mut Mapping, name: &str) -> &'a mut Mapping {
  let slot = parent.entry(key(name)).or_insert(Value::Null);
  if !slot.is_mapping() {
    if !slot.is_null() {
      warn!(key = %name, kind = value_kind(slot), "replacing non-mapping entry with an empty mapping");
    } else {
      debug!(key = %name, "initialized empty mapping");
    }
    *slot = Value::Mapping(Mapping::new());
  }
  match slot {
    Value::Mapping(mapping) => mapping,
    _ => unreachable!("slot was just set to a mapping"),
  }
}

fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Sequence(_) => "sequence",
    Value::Mapping(_) => "mapping",
    Value::Tagged(_) => "tagged value",
  }
}
