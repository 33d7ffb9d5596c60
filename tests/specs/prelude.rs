//! Shared black-box test harness: spawns a real `txd` against a fresh
//! temp state dir and hands back a `txctl` command pre-wired to talk to
//! it, driving a real daemon process rather than mocking the admin
//! protocol.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Child, Output};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use tempfile::TempDir;

pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A running `txd` bound to an isolated state dir. Killed on drop so a
/// panicking assertion never leaks a background daemon.
pub struct Daemon {
    child: Child,
    state_dir: TempDir,
}

impl Daemon {
    /// Starts `txd` and blocks until its admin socket exists (or panics
    /// after [`STARTUP_TIMEOUT`]).
    pub fn start() -> Self {
        Self::start_with_env(&[])
    }

    /// Starts `txd` with extra environment overrides applied before
    /// spawning (e.g. `T_DISPATCH_DEADLINE` for a fast-failing spec).
    pub fn start_with_env(vars: &[(&str, &str)]) -> Self {
        let state_dir = tempfile::tempdir().expect("create temp state dir");
        let mut cmd = Command::cargo_bin("txd").expect("locate txd binary");
        cmd.env("TXD_STATE_DIR", state_dir.path()).env("RUST_LOG", "warn");
        for (key, value) in vars {
            cmd.env(key, value);
        }
        let child = cmd.spawn().expect("spawn txd");
        let daemon = Self { child, state_dir };
        daemon.wait_for_socket();
        daemon
    }

    fn socket_path(&self) -> PathBuf {
        self.state_dir.path().join("txd.sock")
    }

    pub fn socket_exists(&self) -> bool {
        self.socket_path().exists()
    }

    /// Sends SIGTERM to the daemon so its normal shutdown path (flush
    /// in-flight tasks, remove the admin socket) runs, instead of the
    /// hard SIGKILL `Drop` falls back to. No-op on failure to signal
    /// (e.g. the process already exited).
    pub fn terminate_gracefully(&mut self) {
        let pid = self.child.id().to_string();
        let _ = std::process::Command::new("kill").args(["-TERM", &pid]).status();
        let _ = self.child.wait();
    }

    fn wait_for_socket(&self) {
        let deadline = Instant::now() + STARTUP_TIMEOUT;
        while Instant::now() < deadline {
            if self.socket_path().exists() {
                return;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("txd did not bind its admin socket within {STARTUP_TIMEOUT:?}");
    }

    /// A `txctl` command pre-wired with `TXD_STATE_DIR` so it resolves
    /// this daemon's socket the same way the CLI would in production.
    pub fn txctl(&self, args: &[&str]) -> CliRun {
        let mut cmd = Command::cargo_bin("txctl").expect("locate txctl binary");
        cmd.env("TXD_STATE_DIR", self.state_dir.path());
        cmd.args(args);
        CliRun { output: cmd.output().expect("run txctl") }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Runs a bare `txctl` invocation with no daemon behind it, for specs
/// that only exercise argument parsing / help text (clap exits before
/// the admin socket is ever dialed).
pub fn bare_txctl(args: &[&str]) -> CliRun {
    let mut cmd = Command::cargo_bin("txctl").expect("locate txctl binary");
    cmd.args(args);
    CliRun { output: cmd.output().expect("run txctl") }
}

/// A captured `txctl` invocation, asserted on with a fluent
/// `.passes().stdout_has(...)` chain.
pub struct CliRun {
    output: Output,
}

impl CliRun {
    pub fn passes(self) -> Self {
        assert!(self.output.status.success(), "expected success, got {:?}\nstderr: {}", self.output.status, self.stderr());
        self
    }

    pub fn fails(self) -> Self {
        assert!(!self.output.status.success(), "expected failure, got success\nstdout: {}", self.stdout());
        self
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout().contains(needle), "expected stdout to contain {needle:?}, got:\n{}", self.stdout());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr().contains(needle), "expected stderr to contain {needle:?}, got:\n{}", self.stderr());
        self
    }
}
