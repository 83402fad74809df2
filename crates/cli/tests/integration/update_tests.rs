//! Update command integration tests.

use predicates::prelude::*;
use serde_json::json;

use super::common::{TestEnv, package_payload};

const END_TO_END_PAYLOAD: &str = r#"{"package_updates": {"lt": {"2.0.9": {"checksum_sha256": "abc123", "package_id": "libtorrent22", "build_date": "2024-01-01", "build": "7", "category": "runtime", "tag": null}}}}"#;

#[test]
fn update_writes_end_to_end_example() {
  let env = TestEnv::with_manifest("{}\n");

  env
    .cmd()
    .arg(END_TO_END_PAYLOAD)
    .assert()
    .success()
    .stdout(predicate::str::contains("Added: "))
    .stdout(predicate::str::contains("Manifest updated"));

  let expected: serde_yaml::Value = serde_yaml::from_str(
    r#"
packages:
  libtorrent:
    2.0.9:
      checksum_sha256: abc123
      build_date: '2024-01-01'
      build: '7'
      category: runtime
      tag: null
      distribution: [bookworm]
"#,
  )
  .unwrap();
  assert_eq!(env.manifest(), expected);
}

#[test]
fn update_is_idempotent() {
  let env = TestEnv::with_manifest("{}\n");

  env.cmd().arg(END_TO_END_PAYLOAD).assert().success();
  let after_first = env.manifest_text();

  env
    .cmd()
    .arg(END_TO_END_PAYLOAD)
    .assert()
    .success()
    .stdout(predicate::str::contains("Manifest is up to date"))
    .stdout(predicate::str::contains("Unchanged"))
    .stdout(predicate::str::contains("libtorrent 2.0.9"));

  assert_eq!(env.manifest_text(), after_first);
}

#[test]
fn no_op_update_preserves_hand_formatting() {
  let content = "# release manifest, edited by hand\npackages:\n  libtorrent:\n    2.0.9: {checksum_sha256: abc123, build_date: '2024-01-01', build: '7', category: runtime, tag: null, distribution: [bookworm]}\n";
  let env = TestEnv::with_manifest(content);

  env.cmd().arg(END_TO_END_PAYLOAD).assert().success();

  assert_eq!(env.manifest_text(), content);
}

#[test]
fn update_replaces_existing_record() {
  let env = TestEnv::with_manifest(
    r#"packages:
  libfoo:
    1.0.0:
      checksum_sha256: old
      build_date: '2023-01-01'
      build: '1'
      category: runtime
      tag: stable
      distribution: [bullseye]
      signed_by: release-key
"#,
  );

  env
    .cmd()
    .arg(package_payload("foo", "1.0.0", "libfoo", "new").to_string())
    .assert()
    .success()
    .stdout(predicate::str::contains("Updated: "));

  let manifest = env.manifest();
  let entry = &manifest["packages"]["libfoo"]["1.0.0"];
  assert_eq!(entry["checksum_sha256"].as_str(), Some("new"));
  assert!(entry["tag"].is_null());
  assert!(entry.get("signed_by").is_none());
  assert_eq!(entry["distribution"][0].as_str(), Some("bookworm"));
}

#[test]
fn update_creates_packages_key_and_keeps_other_keys() {
  let env = TestEnv::with_manifest("schema: 2\napplications: {}\n");

  env
    .cmd()
    .arg(package_payload("foo", "1.0.0", "libfoo", "abc").to_string())
    .assert()
    .success();

  let manifest = env.manifest();
  assert_eq!(manifest["schema"].as_u64(), Some(2));
  assert_eq!(manifest["packages"]["libfoo"]["1.0.0"]["checksum_sha256"].as_str(), Some("abc"));
}

#[test]
fn update_applications() {
  let env = TestEnv::with_manifest(
    r#"applications:
  rtorrent:
    build_date: '2023-05-01'
    dependencies: [libtorrent, libcurl]
    packages: {libtorrent: 0.13.8}
    owner: media-team
"#,
  );

  let payload = json!({
    "application_updates": {
      "rtorrent": {
        "build_date": "2024-02-02",
        "dependencies": ["libtorrent"],
        "packages": {"libtorrent": "2.0.9"}
      },
      "flood": {}
    }
  });

  env.cmd().arg(payload.to_string()).assert().success();

  let manifest = env.manifest();
  let rtorrent = &manifest["applications"]["rtorrent"];
  assert_eq!(rtorrent["build_date"].as_str(), Some("2024-02-02"));
  assert_eq!(rtorrent["dependencies"].as_sequence().map(Vec::len), Some(1));
  assert_eq!(rtorrent["packages"]["libtorrent"].as_str(), Some("2.0.9"));
  assert!(rtorrent.get("owner").is_none());

  let flood = &manifest["applications"]["flood"];
  assert!(flood["build_date"].is_null());
  assert_eq!(flood["dependencies"].as_sequence().map(Vec::len), Some(0));
  assert_eq!(flood["packages"].as_mapping().map(|m| m.len()), Some(0));
}

#[test]
fn update_reads_payload_from_file() {
  let env = TestEnv::with_manifest("{}\n");
  let payload_path = env.write_file("updates.json", END_TO_END_PAYLOAD);

  env.cmd().arg("--updates-file").arg(&payload_path).assert().success();

  assert!(!env.manifest()["packages"]["libtorrent"]["2.0.9"].is_null());
}

#[test]
fn update_reads_payload_from_stdin() {
  let env = TestEnv::with_manifest("{}\n");

  env
    .cmd()
    .arg("--updates-file")
    .arg("-")
    .write_stdin(END_TO_END_PAYLOAD)
    .assert()
    .success();

  assert!(!env.manifest()["packages"]["libtorrent"]["2.0.9"].is_null());
}

#[test]
fn dry_run_leaves_manifest_untouched() {
  let env = TestEnv::with_manifest("{}\n");

  env
    .cmd()
    .arg(END_TO_END_PAYLOAD)
    .arg("--dry-run")
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"))
    .stdout(predicate::str::contains("Would add"));

  assert_eq!(env.manifest_text(), "{}\n");
}

#[test]
fn json_output_reports_changes() {
  let env = TestEnv::with_manifest("{}\n");

  let output = env
    .cmd()
    .arg(END_TO_END_PAYLOAD)
    .arg("--output")
    .arg("json")
    .output()
    .unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["written"], json!(true));
  assert_eq!(report["report"]["packages"][0]["package_id"], json!("libtorrent"));
  assert_eq!(report["report"]["packages"][0]["alias_of"], json!("libtorrent22"));
  assert_eq!(report["report"]["packages"][0]["change"], json!("added"));
}
