//! Updater configuration.
//!
//! The configuration carries the values that used to be baked into the update
//! logic: the distribution codename stamped on every package record, and the
//! table of runtime-variant package identifiers that collapse onto a single
//! canonical identifier.
//!
//! # Config File Format
//!
//! ```toml
//! distribution = "bookworm"
//!
//! [aliases]
//! libtorrent = ["libtorrent21", "libtorrent22", "libtorrent24"]
//! ```
//!
//! Both keys are optional. An `[aliases]` table replaces the built-in table
//! entirely rather than extending it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_ALIASES, DEFAULT_DISTRIBUTION};

/// Errors that can occur when loading the updater configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Failed to read the config file.
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: io::Error,
  },

  /// Failed to parse the config file TOML.
  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: toml::de::Error,
  },

  /// A variant identifier was assigned to two different canonical identifiers.
  #[error("alias '{alias}' maps to both '{first}' and '{second}'")]
  ConflictingAlias {
    alias: String,
    first: String,
    second: String,
  },

  /// The distribution codename was empty.
  #[error("distribution codename must not be empty")]
  EmptyDistribution,
}

/// Lookup table from variant package identifiers to their canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageAliases {
  /// variant -> canonical
  table: BTreeMap<String, String>,
}

impl Default for PackageAliases {
  fn default() -> Self {
    let table = DEFAULT_ALIASES
      .iter()
      .flat_map(|(canonical, variants)| {
        variants
          .iter()
          .map(move |variant| (variant.to_string(), canonical.to_string()))
      })
      .collect();
    Self { table }
  }
}

impl PackageAliases {
  /// An alias table that leaves every identifier as-is.
  pub fn empty() -> Self {
    Self { table: BTreeMap::new() }
  }

  /// Build a table from `(canonical, variants)` groups.
  ///
  /// Listing the same variant under two different canonical identifiers is an error.
  pub fn from_groups<I, C, V>(groups: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (C, V)>,
    C: Into<String>,
    V: IntoIterator,
    V::Item: Into<String>,
  {
    let mut table: BTreeMap<String, String> = BTreeMap::new();
    for (canonical, variants) in groups {
      let canonical = canonical.into();
      for variant in variants {
        let variant = variant.into();
        match table.get(&variant) {
          Some(existing) if *existing != canonical => {
            return Err(ConfigError::ConflictingAlias {
              alias: variant,
              first: existing.clone(),
              second: canonical,
            });
          }
          _ => {
            table.insert(variant, canonical.clone());
          }
        }
      }
    }
    Ok(Self { table })
  }

  /// Resolve a package identifier to the identifier used as the manifest key.
  pub fn canonicalize<'a>(&'a self, package_id: &'a str) -> &'a str {
    self.table.get(package_id).map(String::as_str).unwrap_or(package_id)
  }

  /// Number of variant identifiers in the table.
  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}

/// Configuration for a manifest update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterConfig {
  /// Distribution codename written into each package record's `distribution`.
  pub distribution: String,
  /// Identifier normalization table applied to package updates.
  pub aliases: PackageAliases,
}

impl Default for UpdaterConfig {
  fn default() -> Self {
    Self {
      distribution: DEFAULT_DISTRIBUTION.to_string(),
      aliases: PackageAliases::default(),
    }
  }
}

/// On-disk shape of the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
  distribution: Option<String>,
  aliases: Option<BTreeMap<String, Vec<String>>>,
}

impl UpdaterConfig {
  /// Load a config file, layering its values over the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: display.clone(),
      source,
    })?;
    Self::from_toml_str(&content).map_err(|e| match e {
      ConfigError::Parse { source, .. } => ConfigError::Parse { path: display, source },
      other => other,
    })
  }

  /// Parse config file content, layering its values over the defaults.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let file: ConfigFile = toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: "<inline>".to_string(),
      source,
    })?;

    let mut config = Self::default();
    if let Some(distribution) = file.distribution {
      config = config.with_distribution(distribution)?;
    }
    if let Some(groups) = file.aliases {
      config.aliases = PackageAliases::from_groups(groups)?;
    }

    debug!(
      distribution = %config.distribution,
      aliases = config.aliases.len(),
      "loaded updater config"
    );
    Ok(config)
  }

  /// Override the distribution codename.
  pub fn with_distribution(mut self, distribution: impl Into<String>) -> Result<Self, ConfigError> {
    let distribution = distribution.into();
    if distribution.trim().is_empty() {
      return Err(ConfigError::EmptyDistribution);
    }
    self.distribution = distribution;
    Ok(self)
  }
}
