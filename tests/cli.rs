//! End-to-end checks of the `llm-adapter` binary that need no network

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn llm_adapter(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("llm-adapter").unwrap();
    cmd.arg("--config")
        .arg(config_dir.path().join("config.json"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(config_dir: &TempDir) {
    let config = serde_json::json!({
        "diagnostic_max_chars": 128,
        "default_backend": "local",
        "backends": [{
            "name": "local",
            "provider": "ollama",
            "model_name": "llama3",
            "temperature": 0.7
        }]
    });
    std::fs::write(
        config_dir.path().join("config.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();
}

#[test]
fn version_prints_package_version() {
    let dir = TempDir::new().unwrap();
    llm_adapter(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn normalize_sorts_mapping_keys() {
    let dir = TempDir::new().unwrap();
    llm_adapter(&dir)
        .args(["normalize", "--json", r#"{"b": 2, "a": 1}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""text": "{\"a\":1,\"b\":2}""#))
        .stdout(predicate::str::contains(r#""role": "user""#));
}

#[test]
fn normalize_reads_stdin() {
    let dir = TempDir::new().unwrap();
    llm_adapter(&dir)
        .arg("normalize")
        .write_stdin("hello from stdin")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""text": "hello from stdin""#));
}

#[test]
fn normalize_rejects_bad_json() {
    let dir = TempDir::new().unwrap();
    llm_adapter(&dir)
        .args(["normalize", "--json", "{oops"])
        .assert()
        .failure();
}

#[test]
fn probe_reports_identity_and_backend_fields() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);

    llm_adapter(&dir)
        .args(["probe", "model_name"])
        .assert()
        .success()
        .stdout("llama3\n");

    llm_adapter(&dir)
        .args(["probe", "temperature"])
        .assert()
        .success()
        .stdout("0.7\n");

    llm_adapter(&dir)
        .args(["probe", "base_url"])
        .assert()
        .success()
        .stdout("http://localhost:11434/v1\n");
}

#[test]
fn probe_unknown_capability_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);

    llm_adapter(&dir)
        .args(["probe", "nonexistent_field"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("capability not found: nonexistent_field"));
}

#[test]
fn malformed_config_only_breaks_backend_commands() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), "{ not json").unwrap();

    llm_adapter(&dir).arg("version").assert().success();
    llm_adapter(&dir)
        .args(["normalize", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""text": "hello""#));
    llm_adapter(&dir)
        .args(["probe", "model_name"])
        .assert()
        .failure();
}

#[test]
fn invoke_without_backends_fails() {
    let dir = TempDir::new().unwrap();
    llm_adapter(&dir)
        .args(["invoke", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backend not found"));
}
