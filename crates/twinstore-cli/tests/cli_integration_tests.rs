//! CLI integration tests
//!
//! Each test runs the binary against its own pair of database files.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn setup(temp_dir: &TempDir) {
    let config = format!(
        "default_mode = \"primary\"\nlog = \"test\"\n\n[primary]\npath = \"{}\"\n\n[secondary]\npath = \"{}\"\n",
        temp_dir.path().join("primary.db").display(),
        temp_dir.path().join("secondary.db").display()
    );
    fs::write(temp_dir.path().join("twinstore.toml"), config).unwrap();
    let output = run(temp_dir.path(), &["init"]);
    assert!(output.status.success(), "init failed: {:?}", output);
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_twinstore"))
        .current_dir(dir)
        .env_remove("TWINSTORE_PRIMARY_PATH")
        .env_remove("TWINSTORE_SECONDARY_PATH")
        .env_remove("TWINSTORE_DEFAULT_MODE")
        .env_remove("TWINSTORE_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_dual_create_visible_in_both_stores() {
    let temp_dir = TempDir::new().unwrap();
    setup(&temp_dir);

    let created = json(&run(
        temp_dir.path(),
        &[
            "--mode", "dual", "create", "product", "-f", "name=Widget", "-f", "category=Tools",
            "-f", "price=9.99",
        ],
    ));
    assert_eq!(created["mode"], "dual");
    assert_eq!(created["kind"], "create");
    let id = created["id"].as_i64().unwrap();

    let primary = json(&run(temp_dir.path(), &["get", "product", &id.to_string()]));
    let secondary = json(&run(
        temp_dir.path(),
        &["get", "product", &id.to_string(), "--mode", "secondary"],
    ));
    assert_eq!(primary, secondary);
    assert_eq!(primary["name"], "Widget");
    assert_eq!(primary["description"], Value::Null);
}

#[test]
fn test_cli_default_mode_writes_primary_only() {
    let temp_dir = TempDir::new().unwrap();
    setup(&temp_dir);

    json(&run(
        temp_dir.path(),
        &[
            "create", "customer", "-f", "first_name=Grace", "-f", "last_name=Hopper", "-f",
            "email=grace@example.com", "-f", "join_date=2021-06-01",
        ],
    ));
    let primary = json(&run(temp_dir.path(), &["list", "customer"]));
    let secondary = json(&run(temp_dir.path(), &["list", "customer", "--mode", "secondary"]));
    assert_eq!(primary.as_array().unwrap().len(), 1);
    assert_eq!(secondary.as_array().unwrap().len(), 0);
}

#[test]
fn test_cli_update_and_delete() {
    let temp_dir = TempDir::new().unwrap();
    setup(&temp_dir);
    let dir = temp_dir.path();

    json(&run(
        dir,
        &[
            "--mode", "dual", "create", "employee", "-f", "first_name=Ada", "-f",
            "last_name=Lovelace", "-f", "position=Analyst", "-f", "hire_date=2020-01-15",
        ],
    ));
    let updated = json(&run(
        dir,
        &[
            "--mode", "dual", "update", "employee", "1", "-f", "first_name=Ada", "-f",
            "last_name=Lovelace", "-f", "position=Lead", "-f", "hire_date=2020-01-15",
        ],
    ));
    assert_eq!(updated["affected"], 1);
    let record = json(&run(dir, &["--mode", "secondary", "get", "employee", "1"]));
    assert_eq!(record["position"], "Lead");

    let deleted = json(&run(dir, &["--mode", "dual", "delete", "employee", "1"]));
    assert_eq!(deleted["affected"], 1);
    let record = json(&run(dir, &["--mode", "secondary", "get", "employee", "1"]));
    assert_eq!(record, Value::Null);
    assert_eq!(json(&run(dir, &["orders"])), serde_json::json!([]));
}

#[test]
fn test_cli_rejects_unknown_mode() {
    let temp_dir = TempDir::new().unwrap();
    setup(&temp_dir);

    let output = run(temp_dir.path(), &["--mode", "both", "list", "product"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("both"), "stderr: {}", stderr);
}

#[test]
fn test_cli_rejects_malformed_field() {
    let temp_dir = TempDir::new().unwrap();
    setup(&temp_dir);

    let output = run(
        temp_dir.path(),
        &["create", "product", "-f", "name=Widget", "-f", "category=Tools", "-f", "price=cheap"],
    );
    assert!(!output.status.success());
}
