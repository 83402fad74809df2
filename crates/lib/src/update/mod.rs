//! Manifest update orchestration.
//!
//! This module provides the core logic of the `update-manifest` command:
//! load the manifest, apply a validated [`UpdateBatch`] to a copy of it, and
//! write the copy back only when it differs from what was loaded.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::UpdaterConfig;
use crate::consts::MANIFEST_FILENAME;
use crate::manifest::{EntryChange, Manifest, ManifestError, save_if_changed};
use crate::payload::UpdateBatch;

/// Options for the update operation.
#[derive(Debug, Default)]
pub struct UpdateOptions {
  /// If true, compute the result but don't write the manifest.
  pub dry_run: bool,
}

/// Errors that can occur during update.
#[derive(Debug, Error)]
pub enum UpdateError {
  /// Manifest file not found.
  #[error("manifest file not found: {path}")]
  ManifestNotFound { path: String },

  /// Failed to load the manifest.
  #[error("failed to load manifest: {0}")]
  Load(#[source] ManifestError),

  /// Failed to save the manifest.
  #[error("failed to save manifest: {0}")]
  Save(#[source] ManifestError),
}

/// Outcome of one package update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageChange {
  /// Identifier used as the manifest key (after alias resolution).
  pub package_id: String,
  /// Identifier as given in the payload, when it differs from `package_id`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub alias_of: Option<String>,
  pub version: String,
  pub build: String,
  pub checksum_sha256: String,
  pub change: EntryChange,
}

/// Outcome of one application update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationChange {
  pub application_id: String,
  pub change: EntryChange,
}

/// Per-entry outcome of applying an update batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
  pub packages: Vec<PackageChange>,
  pub applications: Vec<ApplicationChange>,
}

impl UpdateReport {
  /// Whether any entry was added or modified.
  pub fn has_changes(&self) -> bool {
    self.packages.iter().any(|p| p.change.is_change()) || self.applications.iter().any(|a| a.change.is_change())
  }

  /// Count entries of both kinds with the given change.
  pub fn count(&self, change: EntryChange) -> usize {
    self.packages.iter().filter(|p| p.change == change).count()
      + self.applications.iter().filter(|a| a.change == change).count()
  }
}

/// Result of a successful update run.
#[derive(Debug, Serialize)]
pub struct UpdateOutcome {
  /// Path of the manifest that was loaded.
  pub manifest_path: PathBuf,
  /// Per-entry changes.
  pub report: UpdateReport,
  /// Whether the updated manifest differs from the loaded one.
  pub changed: bool,
  /// Whether the manifest file was rewritten.
  pub written: bool,
  pub dry_run: bool,
}

/// Apply `batch` to a copy of `manifest`.
///
/// Package updates are applied before application updates, each in payload
/// order. Package identifiers go through the configured alias table, and
/// every package record is stamped with the configured distribution.
pub fn apply_updates(manifest: &Manifest, batch: &UpdateBatch, config: &UpdaterConfig) -> (Manifest, UpdateReport) {
  let mut updated = manifest.clone();
  let mut report = UpdateReport::default();

  if !batch.packages.is_empty() {
    info!(count = batch.packages.len(), "processing package updates");
  }
  for update in &batch.packages {
    let package_id = config.aliases.canonicalize(&update.package_id);
    let alias_of = (package_id != update.package_id).then(|| update.package_id.clone());
    if let Some(alias) = &alias_of {
      debug!(alias = %alias, canonical = %package_id, "normalized package identifier");
    }

    let record = update.to_record(&config.distribution);
    let change = updated.update_package_entry(package_id, &update.version, &record);
    report.packages.push(PackageChange {
      package_id: package_id.to_string(),
      alias_of,
      version: update.version.clone(),
      build: update.build.clone(),
      checksum_sha256: update.checksum_sha256.clone(),
      change,
    });
  }

  if !batch.applications.is_empty() {
    info!(count = batch.applications.len(), "processing application updates");
  }
  for update in &batch.applications {
    let change = updated.update_application_entry(&update.application_id, &update.to_record());
    report.applications.push(ApplicationChange {
      application_id: update.application_id.clone(),
      change,
    });
  }

  (updated, report)
}

/// Resolve the manifest path inside a repository directory.
pub fn manifest_path(repo_path: &Path) -> PathBuf {
  repo_path.join(MANIFEST_FILENAME)
}

/// Apply an update batch to `<repo_path>/manifest.yaml`.
///
/// The manifest is written only if applying the batch changed it, and never
/// in dry-run mode.
///
/// # Errors
///
/// Returns an error if:
/// - The manifest file does not exist
/// - The manifest cannot be read or parsed
/// - The updated manifest cannot be written
pub fn update_manifest(
  repo_path: &Path,
  batch: &UpdateBatch,
  config: &UpdaterConfig,
  options: &UpdateOptions,
) -> Result<UpdateOutcome, UpdateError> {
  let path = manifest_path(repo_path);

  let original = Manifest::load(&path).map_err(|e| match e {
    ManifestError::NotFound { path } => UpdateError::ManifestNotFound { path },
    other => UpdateError::Load(other),
  })?;

  let (updated, report) = apply_updates(&original, batch, config);
  let changed = original != updated;

  let written = if options.dry_run {
    info!(changed, "dry run, manifest not written");
    false
  } else {
    save_if_changed(&original, &updated, &path).map_err(UpdateError::Save)?
  };

  Ok(UpdateOutcome {
    manifest_path: path,
    report,
    changed,
    written,
    dry_run: options.dry_run,
  })
}
