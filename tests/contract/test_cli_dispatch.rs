use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `scaffold` isolated in its own CLI home, with the update notice off
fn scaffold(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("scaffold").unwrap();
    cmd.env("SCAFFOLD_HOME", home.path())
        .env("SCAFFOLD_NO_UPDATE_CHECK", "1")
        .env_remove("SCAFFOLD_LOG")
        .env_remove("SCAFFOLD_TARGET_PATH")
        .env_remove("SCAFFOLD_REGISTRY");
    cmd
}

#[test]
fn test_help_lists_init() {
    let home = TempDir::new().unwrap();
    scaffold(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("--target-path"));
}

#[test]
fn test_unknown_command_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    scaffold(&home)
        .args(["deploy", "--prod"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown command 'deploy'"))
        .stderr(predicate::str::contains("init"));
}

/// Config pointing every registry lookup at a closed local port
fn offline_registry(home: &TempDir) {
    fs::write(
        home.path().join("config.toml"),
        "registry = \"offline\"\n\n[registries]\noffline = \"http://127.0.0.1:9\"\n",
    )
    .unwrap();
}

#[test]
fn test_update_check_env_accepts_falsey_values() {
    let home = TempDir::new().unwrap();
    offline_registry(&home);

    scaffold(&home)
        .env("SCAFFOLD_NO_UPDATE_CHECK", "false")
        .args(["--debug", "deploy"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("update check skipped"));

    scaffold(&home)
        .env("SCAFFOLD_NO_UPDATE_CHECK", "0")
        .args(["--debug", "deploy"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("update check skipped"));
}

#[test]
fn test_update_check_env_disables_check() {
    let home = TempDir::new().unwrap();
    offline_registry(&home);

    scaffold(&home)
        .env("SCAFFOLD_NO_UPDATE_CHECK", "true")
        .args(["--debug", "deploy"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("update check skipped").not());
}

#[test]
fn test_override_without_descriptor_fails() {
    let home = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();
    scaffold(&home)
        .arg("--target-path")
        .arg(local.path())
        .args(["init", "my-app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("has no entry file"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join("config.toml"), "registry = [").unwrap();
    scaffold(&home)
        .args(["init", "my-app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_unknown_config_key_is_reported() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join("config.toml"), "colour = \"blue\"\n").unwrap();
    scaffold(&home)
        .args(["init", "my-app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[cfg(unix)]
#[test]
fn test_child_exit_code_and_arguments_are_forwarded() {
    use std::os::unix::fs::PermissionsExt;

    let home = TempDir::new().unwrap();
    let local = TempDir::new().unwrap();

    // Stand-in runtime: prints the evaluated script and exits with 7
    let runtime = home.path().join("fake-node");
    fs::write(&runtime, "#!/bin/sh\necho \"$2\"\nexit 7\n").unwrap();
    fs::set_permissions(&runtime, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(
        home.path().join("config.toml"),
        format!("runtime = \"{}\"\n", runtime.display()),
    )
    .unwrap();

    fs::write(
        local.path().join("package.json"),
        r#"{"name":"@scaffold-cli/init","version":"1.0.0","main":"lib/index.js"}"#,
    )
    .unwrap();

    scaffold(&home)
        .arg("--target-path")
        .arg(local.path())
        .args(["init", "my-app", "--force"])
        .assert()
        .code(7)
        .stdout(predicate::str::contains("lib/index.js"))
        .stdout(predicate::str::contains(r#"["my-app",{"force":true}]"#))
        .stdout(predicate::str::contains("_command").not());
}
