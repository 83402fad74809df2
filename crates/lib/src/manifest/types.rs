//! Record types stored in the manifest.
//!
//! The manifest itself is kept as a generic YAML mapping (see
//! [`Manifest`](super::Manifest)) so that content this tool does not know
//! about survives a rewrite. The records below describe the entries the tool
//! writes, and convert into YAML values with a fixed field order.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Build metadata for one (package, version) artifact.
///
/// Field order matches the persisted layout:
///
/// ```yaml
/// checksum_sha256: abc123
/// build_date: 2024-01-01
/// build: '7'
/// category: runtime
/// tag: null
/// distribution:
/// - bookworm
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageBuildRecord {
  /// SHA-256 of the built artifact.
  pub checksum_sha256: String,
  /// Build timestamp.
  pub build_date: String,
  /// Build identifier or number.
  pub build: String,
  pub category: Option<String>,
  pub tag: Option<String>,
  /// Target distributions. Always a single codename for now.
  pub distribution: Vec<String>,
}

impl PackageBuildRecord {
  /// Create a record targeting a single distribution.
  pub fn new(
    checksum_sha256: impl Into<String>,
    build_date: impl Into<String>,
    build: impl Into<String>,
    distribution: impl Into<String>,
  ) -> Self {
    Self {
      checksum_sha256: checksum_sha256.into(),
      build_date: build_date.into(),
      build: build.into(),
      category: None,
      tag: None,
      distribution: vec![distribution.into()],
    }
  }

  pub fn with_category(mut self, category: Option<String>) -> Self {
    self.category = category;
    self
  }

  pub fn with_tag(mut self, tag: Option<String>) -> Self {
    self.tag = tag;
    self
  }

  /// Convert into the YAML mapping written to the manifest.
  pub fn to_value(&self) -> Value {
    let mut map = Mapping::new();
    map.insert(key("checksum_sha256"), Value::String(self.checksum_sha256.clone()));
    map.insert(key("build_date"), Value::String(self.build_date.clone()));
    map.insert(key("build"), Value::String(self.build.clone()));
    map.insert(key("category"), optional_string(&self.category));
    map.insert(key("tag"), optional_string(&self.tag));
    map.insert(
      key("distribution"),
      Value::Sequence(self.distribution.iter().cloned().map(Value::String).collect()),
    );
    Value::Mapping(map)
  }
}

/// Metadata for one deployable application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
  pub build_date: Option<String>,
  /// Ordered dependency list.
  #[serde(default)]
  pub dependencies: Vec<String>,
  /// Package identifier -> version or metadata, stored as given.
  #[serde(default)]
  pub packages: Mapping,
}

impl ApplicationRecord {
  /// Convert into the YAML mapping written to the manifest.
  pub fn to_value(&self) -> Value {
    let mut map = Mapping::new();
    map.insert(key("build_date"), optional_string(&self.build_date));
    map.insert(
      key("dependencies"),
      Value::Sequence(self.dependencies.iter().cloned().map(Value::String).collect()),
    );
    map.insert(key("packages"), Value::Mapping(self.packages.clone()));
    Value::Mapping(map)
  }
}

/// What overwriting a manifest entry did to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryChange {
  /// The entry did not exist before.
  Added,
  /// The entry existed with different content.
  Updated,
  /// The entry already held identical content.
  Unchanged,
}

impl EntryChange {
  /// Classify an overwrite from the value it displaced.
  pub(crate) fn classify(previous: Option<&Value>, current: &Value) -> Self {
    match previous {
      None => EntryChange::Added,
      Some(previous) if previous == current => EntryChange::Unchanged,
      Some(_) => EntryChange::Updated,
    }
  }

  pub fn is_change(self) -> bool {
    !matches!(self, EntryChange::Unchanged)
  }
}

pub(crate) fn key(name: &str) -> Value {
  Value::String(name.to_string())
}

fn optional_string(value: &Option<String>) -> Value {
  match value {
    Some(s) => Value::String(s.clone()),
    None => Value::Null,
  }
}
