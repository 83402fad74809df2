//! Update batch parsing.
//!
//! The update batch arrives as JSON from the build pipeline:
//!
//! ```json
//! {
//!   "package_updates": {
//!     "libtorrent": {
//!       "2.0.9": {
//!         "checksum_sha256": "abc123",
//!         "package_id": "libtorrent22",
//!         "build_date": "2024-01-01",
//!         "build": "7",
//!         "category": "runtime",
//!         "tag": null
//!       }
//!     }
//!   },
//!   "application_updates": {
//!     "rtorrent": {
//!       "build_date": "2024-01-02",
//!       "dependencies": ["libtorrent"],
//!       "packages": { "libtorrent": "2.0.9" }
//!     }
//!   }
//! }
//! ```
//!
//! Both groups are optional. Every entry is checked here, before anything
//! touches the manifest, so a bad entry anywhere in the batch aborts the run
//! with nothing written. Entry order follows the order in the source text.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};
use serde_yaml::{Mapping, Value as YamlValue};
use thiserror::Error;

use crate::manifest::{ApplicationRecord, PackageBuildRecord};

/// Errors that can occur when parsing an update batch.
#[derive(Debug, Error)]
pub enum PayloadError {
  /// The payload is not valid JSON, or its top level is not an object.
  #[error("failed to parse update payload: {0}")]
  Parse(#[source] serde_json::Error),

  /// A group in the payload has the wrong JSON type.
  #[error("invalid update payload at {path}: expected {expected}")]
  InvalidShape { path: String, expected: &'static str },

  /// An entry could not be read as an update record.
  #[error("invalid update entry at {path}: {source}")]
  InvalidEntry {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  /// A package update lacks a required field.
  #[error("package update {path} is missing {field}")]
  MissingField { field: &'static str, path: String },
}

/// A validated batch of manifest updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBatch {
  pub packages: Vec<PackageUpdate>,
  pub applications: Vec<ApplicationUpdate>,
}

/// One package build to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdate {
  /// Grouping key from the payload (usually the package family name).
  pub group: String,
  /// Package identifier as supplied, before alias resolution.
  pub package_id: String,
  pub version: String,
  pub checksum_sha256: String,
  pub build_date: String,
  pub build: String,
  pub category: Option<String>,
  pub tag: Option<String>,
}

impl PackageUpdate {
  /// Build the manifest record for this update.
  pub fn to_record(&self, distribution: &str) -> PackageBuildRecord {
    PackageBuildRecord::new(&self.checksum_sha256, &self.build_date, &self.build, distribution)
      .with_category(self.category.clone())
      .with_tag(self.tag.clone())
  }
}

/// One application record to replace.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationUpdate {
  pub application_id: String,
  pub build_date: Option<String>,
  pub dependencies: Vec<String>,
  pub packages: Mapping,
}

impl ApplicationUpdate {
  /// Build the manifest record for this update.
  pub fn to_record(&self) -> ApplicationRecord {
    ApplicationRecord {
      build_date: self.build_date.clone(),
      dependencies: self.dependencies.clone(),
      packages: self.packages.clone(),
    }
  }
}

#[derive(Debug, Deserialize)]
struct RawBatch {
  #[serde(default)]
  package_updates: Option<Map<String, JsonValue>>,
  #[serde(default)]
  application_updates: Option<Map<String, JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct RawPackagePayload {
  checksum_sha256: Option<String>,
  package_id: Option<String>,
  build_date: Option<String>,
  #[serde(default, deserialize_with = "string_or_number")]
  build: Option<String>,
  category: Option<String>,
  tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawApplicationPayload {
  build_date: Option<String>,
  dependencies: Option<Vec<String>>,
  packages: Option<Map<String, JsonValue>>,
}

impl UpdateBatch {
  /// Parse and validate a JSON update payload.
  pub fn from_json(text: &str) -> Result<Self, PayloadError> {
    let raw: RawBatch = serde_json::from_str(text).map_err(PayloadError::Parse)?;
    let mut batch = UpdateBatch::default();

    for (group, versions) in raw.package_updates.unwrap_or_default() {
      let group_path = format!("package_updates/{}", group);
      let JsonValue::Object(versions) = versions else {
        return Err(PayloadError::InvalidShape {
          path: group_path,
          expected: "an object keyed by version",
        });
      };

      for (version, payload) in versions {
        let path = format!("{}/{}", group_path, version);
        let raw: RawPackagePayload = serde_json::from_value(payload).map_err(|source| PayloadError::InvalidEntry {
          path: path.clone(),
          source,
        })?;
        batch.packages.push(PackageUpdate::from_raw(group.clone(), version, raw, &path)?);
      }
    }

    for (application_id, payload) in raw.application_updates.unwrap_or_default() {
      let path = format!("application_updates/{}", application_id);
      let raw: RawApplicationPayload =
        serde_json::from_value(payload).map_err(|source| PayloadError::InvalidEntry { path, source })?;
      batch.applications.push(ApplicationUpdate {
        application_id,
        build_date: raw.build_date,
        dependencies: raw.dependencies.unwrap_or_default(),
        packages: raw.packages.map(object_to_mapping).unwrap_or_default(),
      });
    }

    Ok(batch)
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty() && self.applications.is_empty()
  }
}

impl PackageUpdate {
  fn from_raw(group: String, version: String, raw: RawPackagePayload, path: &str) -> Result<Self, PayloadError> {
    let missing = |field: &'static str| PayloadError::MissingField {
      field,
      path: path.to_string(),
    };

    let package_id = non_empty(raw.package_id).ok_or_else(|| missing("package_id"))?;
    let checksum_sha256 = non_empty(raw.checksum_sha256).ok_or_else(|| missing("checksum_sha256"))?;
    let version = non_empty(Some(version)).ok_or_else(|| missing("version"))?;
    let build_date = non_empty(raw.build_date).ok_or_else(|| missing("build_date"))?;
    let build = non_empty(raw.build).ok_or_else(|| missing("build"))?;

    Ok(Self {
      group,
      package_id,
      version,
      checksum_sha256,
      build_date,
      build,
      category: raw.category,
      tag: raw.tag,
    })
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|s| !s.is_empty())
}

/// Accept build identifiers given either as strings or as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Scalar {
    String(String),
    Number(serde_json::Number),
  }

  Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
    Scalar::String(s) => s,
    Scalar::Number(n) => n.to_string(),
  }))
}

fn object_to_mapping(object: Map<String, JsonValue>) -> Mapping {
  object
    .into_iter()
    .map(|(k, v)| (YamlValue::String(k), json_to_yaml(v)))
    .collect()
}

fn json_to_yaml(value: JsonValue) -> YamlValue {
  match value {
    JsonValue::Null => YamlValue::Null,
    JsonValue::Bool(b) => YamlValue::Bool(b),
    JsonValue::Number(n) => {
      if let Some(i) = n.as_i64() {
        YamlValue::Number(i.into())
      } else if let Some(u) = n.as_u64() {
        YamlValue::Number(u.into())
      } else {
        YamlValue::Number(n.as_f64().unwrap_or(f64::NAN).into())
      }
    }
    JsonValue::String(s) => YamlValue::String(s),
    JsonValue::Array(items) => YamlValue::Sequence(items.into_iter().map(json_to_yaml).collect()),
    JsonValue::Object(object) => YamlValue::Mapping(object_to_mapping(object)),
  }
}
