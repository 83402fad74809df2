//! manifest-updater-lib: Core types and logic for maintaining a build manifest
//!
//! This crate provides the pieces behind `update-manifest`:
//! - `Manifest`: the YAML document recording package builds and applications
//! - `UpdateBatch`: a validated set of package/application updates
//! - `UpdaterConfig`: target distribution and package identifier aliases
//! - `update_manifest`: the load, apply, write-if-changed cycle

pub mod config;
pub mod consts;
pub mod manifest;
pub mod payload;
pub mod update;
