// SPDX-License-Identifier: MIT

//! Shared subprocess plumbing (§4.3, §9): spawn into a fresh process group so
//! the whole subtree is cancellable, run under a timeout, and terminate with
//! a SIGTERM-then-SIGKILL grace period, using `nix` for process-group
//! signals.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};

/// Default timeout for a single gate command (§4.5).
pub const GATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default timeout for a coding-agent subprocess (§4.3).
pub const AGENT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Grace period between SIGTERM and SIGKILL on group termination (§4.3).
pub const TERMINATE_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("{label} timed out after {timeout:?}")]
    Timeout { label: String, timeout: Duration },
}

/// Put `cmd` in its own process group (pid becomes the group leader) so a
/// timeout or shutdown can signal the entire subtree at once.
pub fn spawn_in_group(mut cmd: Command) -> Result<Child, SubprocessError> {
    // SAFETY: `process_group(0)` makes the child its own group leader via
    // setpgid(0, 0) in the child post-fork, before exec — standard library
    // support for exactly this, no raw libc/nix call needed here.
    cmd.process_group(0);
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.stdin(std::process::Stdio::null());
    Ok(cmd.spawn()?)
}

/// Run `cmd` to completion in its own process group, terminating the whole
/// group if `timeout` elapses.
pub async fn run_with_timeout(cmd: Command, timeout: Duration, label: &str) -> Result<Output, SubprocessError> {
    let child = spawn_in_group(cmd)?;
    let pgid = Pid::from_raw(child.id().ok_or_else(|| {
        std::io::Error::other("child exited before pid could be read")
    })? as i32);

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(SubprocessError::Spawn(e)),
        Err(_) => {
            terminate_group(pgid, TERMINATE_GRACE).await;
            Err(SubprocessError::Timeout {
                label: label.to_string(),
                timeout,
            })
        }
    }
}

/// Send SIGTERM to the process group, wait `grace`, then SIGKILL anything
/// still alive. Best-effort: a group that's already gone is not an error.
pub async fn terminate_group(pgid: Pid, grace: Duration) {
    let _ = signal::killpg(pgid, Signal::SIGTERM);
    tokio::time::sleep(grace).await;
    let _ = signal::killpg(pgid, Signal::SIGKILL);
}

/// Truncated head/tail sample of a byte stream (§4.3): first `n` and last
/// `n` chars, joined with an ellipsis marker if the stream was truncated.
pub fn sample(bytes: &[u8], n: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 2 * n {
        return chars.into_iter().collect();
    }
    let head: String = chars[..n].iter().collect();
    let tail: String = chars[chars.len() - n..].iter().collect();
    format!("{head}\n...[truncated]...\n{tail}")
}

/// Synthesize an `ExitStatus` for tests without actually spawning a process.
#[cfg(any(test, feature = "test-support"))]
pub fn exit_status(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
