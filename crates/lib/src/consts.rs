//! Shared constants.

/// Name of the manifest file inside a repository directory.
pub const MANIFEST_FILENAME: &str = "manifest.yaml";

/// Distribution codename written into package records when none is configured.
pub const DEFAULT_DISTRIBUTION: &str = "bookworm";

/// Environment variable pointing at an updater config file.
pub const CONFIG_ENV_VAR: &str = "MANIFEST_UPDATER_CONFIG";

/// Runtime-variant package identifiers and the canonical identifier they collapse to.
pub const DEFAULT_ALIASES: &[(&str, &[&str])] = &[("libtorrent", &["libtorrent21", "libtorrent22", "libtorrent24"])];
