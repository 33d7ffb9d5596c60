//! `txctl` help output. Clap resolves `--help` before the admin socket
//! is ever dialed, so these run without a daemon.

use crate::prelude::bare_txctl;

#[test]
fn txctl_no_args_shows_usage_and_fails() {
    bare_txctl(&[]).fails().stderr_has("Usage:");
}

#[test]
fn txctl_help_shows_subcommands() {
    bare_txctl(&["--help"])
        .passes()
        .stdout_has("engines")
        .stdout_has("jobs")
        .stdout_has("webhooks")
        .stdout_has("sessions");
}

#[test]
fn txctl_engines_help_shows_list_and_drain() {
    bare_txctl(&["engines", "--help"]).passes().stdout_has("list").stdout_has("drain");
}

#[test]
fn txctl_jobs_help_shows_cancel_and_retry_task() {
    bare_txctl(&["jobs", "--help"]).passes().stdout_has("cancel").stdout_has("retry-task");
}

#[test]
fn txctl_version_shows_version() {
    bare_txctl(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn txctl_without_running_daemon_reports_not_running() {
    // No Daemon harness here: TXD_STATE_DIR points at an empty temp dir
    // with no socket, so the client's own "not running" error surfaces.
    let state_dir = tempfile::tempdir().unwrap();
    let mut cmd = assert_cmd::Command::cargo_bin("txctl").unwrap();
    cmd.env("TXD_STATE_DIR", state_dir.path()).args(["sessions", "list"]);
    let output = cmd.output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not running"));
}
