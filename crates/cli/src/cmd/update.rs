//! Implementation of the `update-manifest` command.
//!
//! This command applies a JSON update batch to `manifest.yaml` in a
//! repository directory, rewriting the file only when its content changes.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::debug;

use manifest_updater_lib::config::UpdaterConfig;
use manifest_updater_lib::payload::UpdateBatch;
use manifest_updater_lib::update::{UpdateOptions, UpdateOutcome, update_manifest};

use crate::output::{
  OutputFormat, describe_change, format_duration, print_info, print_json, print_success, print_warning, symbols,
  truncate_hash,
};

/// Where the update payload comes from.
#[derive(Debug)]
pub enum PayloadSource {
  /// Payload passed directly on the command line.
  Inline(String),
  /// Payload read from a file, or stdin when the path is `-`.
  File(PathBuf),
}

impl PayloadSource {
  fn read(&self) -> Result<String> {
    match self {
      PayloadSource::Inline(text) => Ok(text.clone()),
      PayloadSource::File(path) if path.as_os_str() == "-" => {
        let mut text = String::new();
        std::io::stdin()
          .read_to_string(&mut text)
          .context("Failed to read update payload from stdin")?;
        Ok(text)
      }
      PayloadSource::File(path) => std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read update payload from {}", path.display())),
    }
  }
}

/// Inputs for one update run.
#[derive(Debug)]
pub struct UpdateArgs {
  pub repo_path: PathBuf,
  pub payload: PayloadSource,
  pub config: Option<PathBuf>,
  pub distribution: Option<String>,
  pub dry_run: bool,
  pub output: OutputFormat,
}

/// Execute the update command.
///
/// Loads the updater config, parses the payload, then applies it to the
/// manifest. The payload is fully validated before the manifest is read.
///
/// # Errors
///
/// Returns an error if the config or payload is invalid, the manifest is
/// missing or malformed, or the manifest cannot be written.
pub fn cmd_update(args: UpdateArgs) -> Result<()> {
  let start = Instant::now();

  let config = load_config(args.config.as_deref(), args.distribution)?;
  debug!(config = ?args.config, distribution = %config.distribution, "using updater config");

  let text = args.payload.read()?;
  let batch = UpdateBatch::from_json(&text).context("Invalid update payload")?;
  if batch.is_empty() {
    print_warning("Update payload contains no package or application updates");
  }

  let options = UpdateOptions { dry_run: args.dry_run };
  let outcome = update_manifest(&args.repo_path, &batch, &config, &options).context("Failed to update manifest")?;

  if args.output.is_json() {
    return print_json(&outcome);
  }

  print_outcome(&outcome);
  if outcome.written {
    println!(
      "  {} Duration: {}",
      symbols::INFO.dimmed(),
      format_duration(start.elapsed()).dimmed()
    );
  }

  Ok(())
}

fn load_config(path: Option<&Path>, distribution: Option<String>) -> Result<UpdaterConfig> {
  let config = match path {
    Some(path) => UpdaterConfig::load(path).context("Failed to load updater config")?,
    None => UpdaterConfig::default(),
  };
  match distribution {
    Some(distribution) => config
      .with_distribution(distribution)
      .context("Invalid --distribution"),
    None => Ok(config),
  }
}

fn print_outcome(outcome: &UpdateOutcome) {
  let dry_run = outcome.dry_run;

  if dry_run {
    println!("{}", "Dry run - no changes written".yellow());
    println!();
  }

  let mut unchanged = Vec::new();

  for package in &outcome.report.packages {
    let label = format!("{} {}", package.package_id, package.version);
    let Some((symbol, verb)) = describe_change(package.change, dry_run) else {
      unchanged.push(label);
      continue;
    };
    let alias = package
      .alias_of
      .as_ref()
      .map(|alias| format!(", from {}", alias))
      .unwrap_or_default();
    println!(
      "  {} {}: {} {}",
      symbol.green(),
      verb,
      label.cyan(),
      format!(
        "(build {}, {}{})",
        package.build,
        truncate_hash(&package.checksum_sha256),
        alias
      )
      .dimmed()
    );
  }

  for application in &outcome.report.applications {
    let Some((symbol, verb)) = describe_change(application.change, dry_run) else {
      unchanged.push(application.application_id.clone());
      continue;
    };
    println!(
      "  {} {}: {} {}",
      symbol.green(),
      verb,
      application.application_id.cyan(),
      "(application)".dimmed()
    );
  }

  if !unchanged.is_empty() {
    println!("  {} Unchanged: {}", symbols::INFO.dimmed(), unchanged.join(", ").dimmed());
  }

  if !outcome.changed {
    print_success("Manifest is up to date.");
  } else if outcome.written {
    println!();
    print_success(&format!("Manifest updated: {}", outcome.manifest_path.display()));
  } else {
    print_info(&format!("Manifest would change: {}", outcome.manifest_path.display()));
  }
}
