//! Shared test harness: an isolated `Project` (its own `VC_STATE_DIR`) and
//! thin assertion helpers over `assert_cmd::Output`, grounded on the
//! teacher's `Project` + `.passes()`/`.stdout_has()` harness convention.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub const WAIT_MAX_MS: u64 = 5_000;

/// Poll `check` every 50ms until it returns `true` or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// An isolated instance: its own temp state dir, so concurrently-running
/// tests never share a socket, lock file, or WAL.
pub struct Project {
    _dir: TempDir,
    state_dir: PathBuf,
}

impl Project {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let state_dir = dir.path().join("state");
        std::fs::create_dir_all(&state_dir).expect("create state dir");
        Self { _dir: dir, state_dir }
    }

    fn base_cmd(&self, bin: &str) -> Command {
        let mut cmd = Command::cargo_bin(bin).unwrap_or_else(|_| panic!("binary {bin} not built"));
        cmd.env("VC_STATE_DIR", &self.state_dir);
        cmd.env("VC_PREFLIGHT_ENABLED", "false");
        cmd.env("VC_LOOP_DETECTOR_ENABLED", "false");
        cmd.env("VC_WATCHDOG_ENABLED", "false");
        cmd
    }

    /// `vc` client command, pre-wired to this project's state dir.
    pub fn vc(&self) -> Command {
        self.base_cmd("vc")
    }

    /// Convenience: `vc <args>` run to completion.
    pub fn vc_args(&self, args: &[&str]) -> Output {
        let output = self.vc().args(args).output().expect("spawn vc");
        Output::from(output)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("daemon.pid")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_dir.join("daemon.sock")
    }

    pub fn is_daemon_up(&self) -> bool {
        self.vc_args(&["status"]).succeeded()
    }

    /// Stop whatever daemon this project may have started, ignoring errors —
    /// best-effort cleanup so one test's leftover process never haunts another.
    pub fn cleanup(&self) {
        let _ = self.vc_args(&["stop"]);
        wait_for(WAIT_MAX_MS, || !self.socket_path().exists());
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Captured subprocess output plus small fluent assertions.
pub struct Output {
    pub status_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for Output {
    fn from(output: std::process::Output) -> Self {
        Self {
            status_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Output {
    pub fn succeeded(&self) -> bool {
        self.status_ok
    }

    #[track_caller]
    pub fn passes(self) -> Self {
        assert!(self.status_ok, "expected success, got failure.\nstdout: {}\nstderr: {}", self.stdout, self.stderr);
        self
    }

    #[track_caller]
    pub fn fails(self) -> Self {
        assert!(!self.status_ok, "expected failure, got success.\nstdout: {}", self.stdout);
        self
    }

    #[track_caller]
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout did not contain {needle:?}:\n{}", self.stdout);
        self
    }

    #[track_caller]
    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr did not contain {needle:?}:\n{}", self.stderr);
        self
    }
}
