//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use assert_cmd::Command;
use predicates::prelude::*;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("Options:"));
}

#[test]
fn short_help_flag_shows_usage() {
    cmd()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn help_lists_all_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn short_version_flag_shows_version() {
    cmd()
        .arg("-V")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Status Command
// =============================================================================

#[test]
fn status_reports_without_a_project() {
    // No version record in /tmp; status still reports, it just has less to say
    cmd()
        .args(["-C", "/tmp", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains("Checkpoint"));
}

#[test]
fn status_json_outputs_valid_json() {
    let output = cmd()
        .args(["-C", "/tmp", "status", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("status --json should output valid JSON");

    assert!(json["version_file"].is_string());
}

#[test]
fn status_help_shows_command_options() {
    cmd()
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"));
}

// =============================================================================
// Doctor Command
// =============================================================================

#[test]
fn doctor_json_outputs_valid_json() {
    let output = cmd()
        .args(["-C", "/tmp", "doctor", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("doctor --json should output valid JSON");

    assert!(json["tools"].is_array());
    assert!(json["repository"]["inside"].is_boolean());
}

// =============================================================================
// Run Command Flags
// =============================================================================

#[test]
fn run_help_shows_resume_and_dry_run() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--resume"))
        .stdout(predicate::str::contains("--dry-run"));
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn quiet_flag_accepted() {
    cmd().args(["--quiet", "-C", "/tmp", "status"]).assert().success();
}

#[test]
fn short_quiet_flag_accepted() {
    cmd().args(["-q", "-C", "/tmp", "status"]).assert().success();
}

#[test]
fn verbose_flag_accepted() {
    cmd()
        .args(["--verbose", "-C", "/tmp", "status"])
        .assert()
        .success();
}

#[test]
fn short_verbose_flag_accepted() {
    cmd().args(["-v", "-C", "/tmp", "status"]).assert().success();
}

#[test]
fn multiple_verbose_flags_accepted() {
    cmd().args(["-vv", "-C", "/tmp", "status"]).assert().success();
}

#[test]
fn color_auto_accepted() {
    cmd()
        .args(["--color", "auto", "-C", "/tmp", "status"])
        .assert()
        .success();
}

#[test]
fn color_always_accepted() {
    cmd()
        .args(["--color", "always", "-C", "/tmp", "status"])
        .assert()
        .success();
}

#[test]
fn color_never_accepted() {
    cmd()
        .args(["--color", "never", "-C", "/tmp", "status"])
        .assert()
        .success();
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_subcommand_shows_error() {
    cmd()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn invalid_flag_shows_error() {
    cmd()
        .arg("--not-a-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// =============================================================================
// Chdir Flag
// =============================================================================

#[test]
fn chdir_flag_changes_directory() {
    // The -C flag should be accepted and work without error
    // We use a path that definitely exists
    cmd().args(["-C", "/tmp", "status"]).assert().success();
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "status"])
        .assert()
        .failure();
}
