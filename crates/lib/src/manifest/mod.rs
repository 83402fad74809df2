//! The build manifest: package and application records.
//!
//! A manifest is read once per run, updated on a copy, and written back only
//! when the copy differs from what was read.

mod document;
mod types;

pub use document::{Manifest, ManifestError, save_if_changed};
pub use types::{ApplicationRecord, EntryChange, PackageBuildRecord};
