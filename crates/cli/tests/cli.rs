use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TOKEN_ABI: &str = r#"[
  { "type": "function", "name": "balanceOf", "stateMutability": "view",
    "inputs": [{ "name": "owner", "type": "address" }],
    "outputs": [{ "name": "", "type": "uint256" }] }
]"#;

fn contractgen() -> Command {
    let mut cmd = Command::cargo_bin("contractgen").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_project(root: &Path, config: &str) {
    fs::create_dir_all(root.join("abis")).unwrap();
    fs::write(root.join("abis/Token.json"), TOKEN_ABI).unwrap();
    fs::write(root.join("contractgen.json"), config).unwrap();
}

#[test]
fn test_help() {
    contractgen()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_init_writes_config_once() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("foundry.toml"), "[profile.default]").unwrap();

    contractgen()
        .args(["init", "--cwd"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));

    let written = fs::read_to_string(temp_dir.path().join("contractgen.json")).unwrap();
    assert!(written.contains(r#""directory": "out""#));
    assert!(written.contains("forge"));

    contractgen()
        .args(["init", "--cwd"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_generate_writes_every_target() {
    let temp_dir = TempDir::new().unwrap();
    write_project(
        temp_dir.path(),
        r#"{
          "targets": [
            {
              "out": "src/generated.ts",
              "contracts": [{
                "name": "Vault",
                "abi": [],
                "address": { "1": "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed" }
              }],
              "plugins": [{ "name": "artifacts", "options": { "directory": "abis" } }]
            },
            { "out": "src/plain.js", "plugins": [{ "name": "artifacts", "options": { "directory": "abis" } }] }
          ]
        }"#,
    );

    contractgen()
        .arg("generate")
        .arg("--root")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("src/generated.ts (2 contracts)"))
        .stdout(predicate::str::contains("src/plain.js (1 contracts)"));

    let typescript = fs::read_to_string(temp_dir.path().join("src/generated.ts")).unwrap();
    assert!(typescript.contains("export const vaultABI"));
    assert!(typescript.contains("export const vaultAddress"));
    assert!(typescript.contains("export const tokenABI"));
    assert!(typescript.contains("as const"));

    let javascript = fs::read_to_string(temp_dir.path().join("src/plain.js")).unwrap();
    assert!(javascript.contains("export const tokenABI"));
    assert!(!javascript.contains("as const"));
}

#[test]
fn test_generate_fails_when_a_target_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_project(
        temp_dir.path(),
        r#"{
          "targets": [
            { "out": "good.ts", "plugins": [{ "name": "artifacts", "options": { "directory": "abis" } }] },
            { "out": "bad.ts", "plugins": [{ "name": "artifacts", "options": { "directory": "missing" } }] }
          ]
        }"#,
    );

    contractgen()
        .arg("generate")
        .arg("--root")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("✅ good.ts"))
        .stdout(predicate::str::contains("❌ bad.ts"))
        .stderr(predicate::str::contains("1 target(s) failed"));

    assert!(temp_dir.path().join("good.ts").exists());
    assert!(!temp_dir.path().join("bad.ts").exists());
}

#[test]
fn test_generate_rejects_duplicate_outputs() {
    let temp_dir = TempDir::new().unwrap();
    write_project(
        temp_dir.path(),
        r#"{ "targets": [{ "out": "same.ts" }, { "out": "same.ts" }] }"#,
    );

    contractgen()
        .arg("generate")
        .arg("--root")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate output target"));

    assert!(!temp_dir.path().join("same.ts").exists());
}

#[test]
fn test_generate_without_config() {
    let temp_dir = TempDir::new().unwrap();

    contractgen()
        .arg("generate")
        .arg("--config")
        .arg("nowhere.json")
        .arg("--root")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere.json"));
}
