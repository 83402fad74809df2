//! Failure-path integration tests: every error exits non-zero and writes nothing.

use predicates::prelude::*;
use serde_json::json;

use super::common::{TestEnv, package_payload};

const EXISTING: &str = "packages:\n  libfoo:\n    1.0.0: {checksum_sha256: old, build_date: '2023-01-01', build: '1', category: null, tag: null, distribution: [bookworm]}\n";

#[test]
fn missing_checksum_aborts_without_write() {
  let env = TestEnv::with_manifest(EXISTING);

  // The second entry is valid; the first one must still abort the whole batch.
  let payload = json!({
    "package_updates": {
      "foo": {
        "2.0.0": {"package_id": "libfoo", "build_date": "2024-01-01", "build": "2"},
        "3.0.0": {"checksum_sha256": "c3", "package_id": "libfoo", "build_date": "2024-01-01", "build": "3"}
      }
    }
  });

  env
    .cmd()
    .arg(payload.to_string())
    .assert()
    .failure()
    .stderr(predicate::str::contains("checksum_sha256"));

  assert_eq!(env.manifest_text(), EXISTING);
}

#[test]
fn missing_build_aborts_without_write() {
  let env = TestEnv::with_manifest(EXISTING);
  let mut payload = package_payload("foo", "2.0.0", "libfoo", "c2");
  payload["package_updates"]["foo"]["2.0.0"]["build"] = json!("");

  env
    .cmd()
    .arg(payload.to_string())
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing build"));

  assert_eq!(env.manifest_text(), EXISTING);
}

#[test]
fn missing_build_date_aborts_without_write() {
  let env = TestEnv::with_manifest(EXISTING);
  let mut payload = package_payload("foo", "2.0.0", "libfoo", "c2");
  payload["package_updates"]["foo"]["2.0.0"]["build_date"] = json!(null);

  env
    .cmd()
    .arg(payload.to_string())
    .assert()
    .failure()
    .stderr(predicate::str::contains("build_date"));

  assert_eq!(env.manifest_text(), EXISTING);
}

#[test]
fn empty_version_aborts_without_write() {
  let env = TestEnv::with_manifest(EXISTING);

  env
    .cmd()
    .arg(package_payload("foo", "", "libfoo", "c2").to_string())
    .assert()
    .failure()
    .stderr(predicate::str::contains("version"));

  assert_eq!(env.manifest_text(), EXISTING);
}

#[test]
fn malformed_payload_fails() {
  let env = TestEnv::with_manifest(EXISTING);

  env
    .cmd()
    .arg("{not json")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid update payload"));

  assert_eq!(env.manifest_text(), EXISTING);
}

#[test]
fn malformed_payload_is_reported_before_missing_manifest() {
  let env = TestEnv::empty();

  env
    .cmd()
    .arg("{not json")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid update payload"));
}

#[test]
fn missing_manifest_fails() {
  let env = TestEnv::empty();

  env
    .cmd()
    .arg(package_payload("foo", "1.0.0", "libfoo", "abc").to_string())
    .assert()
    .failure()
    .stderr(predicate::str::contains("manifest file not found"));

  assert!(!env.manifest_path.exists());
}

#[test]
fn malformed_manifest_fails() {
  let env = TestEnv::with_manifest("packages: [unclosed\n");

  env
    .cmd()
    .arg(package_payload("foo", "1.0.0", "libfoo", "abc").to_string())
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to parse manifest"));

  assert_eq!(env.manifest_text(), "packages: [unclosed\n");
}

#[test]
fn missing_payload_fails() {
  let env = TestEnv::with_manifest(EXISTING);

  env.cmd().assert().failure();
}
