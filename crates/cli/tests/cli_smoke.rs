//! CLI smoke tests for hashpack.
//!
//! These tests verify that every command runs without panicking and returns
//! appropriate exit codes.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the hashpack binary, isolated from the caller's mode.
fn hashpack_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("hashpack");
  cmd.env_remove("HASHPACK_MODE");
  cmd
}

/// Create a temp project with the given files under its root.
fn temp_project(files: &[(&str, &[u8])]) -> TempDir {
  let temp = TempDir::new().unwrap();
  for (path, content) in files {
    let path = temp.path().join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }
  temp
}

fn files_in(dir: &Path) -> Vec<String> {
  let mut names: Vec<String> = fs::read_dir(dir)
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  names
}

const ENTRY: &[u8] = br#"import greeting from "./greeting.txt";
document.title = greeting;
"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  hashpack_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  hashpack_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("hashpack"));
}

#[test]
fn build_help_lists_flags() {
  hashpack_cmd()
    .args(["build", "--help"])
    .assert()
    .success()
    .stdout(predicate::str::contains("--mode"))
    .stdout(predicate::str::contains("--watch"));
}

#[test]
fn unknown_command_fails() {
  hashpack_cmd().arg("deploy").assert().failure();
}

// =============================================================================
// Build
// =============================================================================

#[test]
fn build_writes_bundle_and_document() {
  let temp = temp_project(&[("src/index.js", ENTRY), ("src/greeting.txt", b"hello")]);

  hashpack_cmd()
    .current_dir(temp.path())
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Built 2 modules"));

  let dist = temp.path().join("dist");
  let names = files_in(&dist);
  assert_eq!(names.len(), 2, "{names:?}");
  assert!(names.contains(&"index.html".to_string()));
  assert!(names.iter().any(|n| n.starts_with("bundle.") && n.ends_with(".js")));

  let html = fs::read_to_string(dist.join("index.html")).unwrap();
  assert!(html.contains("<script defer src=\"bundle."));
}

#[test]
fn build_json_reports_emitted_files() {
  let temp = temp_project(&[("src/index.js", ENTRY), ("src/greeting.txt", b"hello")]);

  let output = hashpack_cmd()
    .current_dir(temp.path())
    .args(["build", "--format", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["mode"], "production");
  assert_eq!(report["entry_document"], "index.html");
  assert!(report["output_hash"].as_str().is_some_and(|h| h.len() == 64));
}

#[test]
fn development_mode_uses_plain_names() {
  let temp = temp_project(&[("src/index.js", ENTRY), ("src/greeting.txt", b"hello")]);

  hashpack_cmd()
    .current_dir(temp.path())
    .args(["build", "--mode", "development"])
    .assert()
    .success();

  assert!(temp.path().join("dist/bundle.js").exists());
}

#[test]
fn mode_env_var_is_honored() {
  let temp = temp_project(&[("src/index.js", ENTRY), ("src/greeting.txt", b"hello")]);

  hashpack_cmd()
    .current_dir(temp.path())
    .env("HASHPACK_MODE", "development")
    .arg("build")
    .assert()
    .success();

  assert!(temp.path().join("dist/bundle.js").exists());
}

#[test]
fn invalid_mode_is_rejected() {
  hashpack_cmd().args(["build", "--mode", "staging"]).assert().failure();
}

#[test]
fn output_dir_override() {
  let temp = temp_project(&[("src/index.js", b"console.log(1);\n")]);

  hashpack_cmd()
    .current_dir(temp.path())
    .args(["build", "--output-dir", "public"])
    .assert()
    .success();

  assert!(temp.path().join("public/index.html").exists());
  assert!(!temp.path().join("dist").exists());
}

#[test]
fn output_dir_over_project_root_is_refused() {
  let temp = temp_project(&[("src/index.js", b"console.log(1);\n")]);

  hashpack_cmd()
    .current_dir(temp.path())
    .args(["build", "--output-dir", "."])
    .assert()
    .failure()
    .stderr(predicate::str::contains("would contain the project sources"));

  assert!(temp.path().join("src/index.js").is_file());
}

#[test]
fn missing_reference_fails() {
  let temp = temp_project(&[("src/index.js", b"import \"./missing.js\";\n")]);

  hashpack_cmd()
    .current_dir(temp.path())
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("./missing.js"));
}

#[test]
fn missing_entry_fails() {
  let temp = TempDir::new().unwrap();

  hashpack_cmd()
    .current_dir(temp.path())
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Build failed"));
}

#[test]
fn invalid_config_fails() {
  let temp = temp_project(&[("hashpack.toml", b"mode = 42\n"), ("src/index.js", b"1;\n")]);

  hashpack_cmd()
    .current_dir(temp.path())
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("configuration"));
}

// =============================================================================
// Init
// =============================================================================

#[test]
fn init_then_build() {
  let temp = TempDir::new().unwrap();
  let project = temp.path().join("site");

  hashpack_cmd()
    .arg("init")
    .arg(&project)
    .assert()
    .success()
    .stdout(predicate::str::contains("Initialized"));

  assert!(project.join("hashpack.toml").exists());
  assert!(project.join("src/index.js").exists());

  hashpack_cmd().current_dir(&project).arg("build").assert().success();
  assert!(project.join("dist/index.html").exists());
}

#[test]
fn init_refuses_existing_project() {
  let temp = temp_project(&[("hashpack.toml", b"# mine\n")]);

  hashpack_cmd()
    .arg("init")
    .arg(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("already exists"));

  hashpack_cmd().arg("init").arg(temp.path()).arg("--force").assert().success();
}
