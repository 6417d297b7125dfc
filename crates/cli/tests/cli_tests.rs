//! CLI integration tests

use std::process::Command;

fn bearingctl(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "bearingctl", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = bearingctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Bearing Failure Monitor"),
        "Should show app name"
    );
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("live"), "Should show live command");
    assert!(stdout.contains("window"), "Should show window command");
    assert!(stdout.contains("health"), "Should show health command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = bearingctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("bearingctl"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = bearingctl(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--values"), "Should show values option");
    assert!(stdout.contains("--csv"), "Should show csv option");
    assert!(stdout.contains("--mode"), "Should show mode option");
}

/// Predict without any reading source is a usage error
#[test]
fn test_predict_requires_input() {
    let output = bearingctl(&["predict"]);
    assert!(!output.status.success(), "Predict without input should fail");
}

/// Reading sources are mutually exclusive
#[test]
fn test_predict_rejects_two_inputs() {
    let output = bearingctl(&["predict", "--values", "1,2", "--file", "x.json"]);
    assert!(!output.status.success());
}
