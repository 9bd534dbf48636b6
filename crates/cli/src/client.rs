// SPDX-License-Identifier: MIT

//! Control-socket client plumbing: connect-and-send for RPCs (§6.2), plus
//! process management for the background `vcd` binary.

use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use vc_daemon::Config;
use vc_wire::{ControlRequest, ControlResponse};

pub async fn send(config: &Config, request: ControlRequest) -> Result<ControlResponse> {
    vc_daemon::control::send_request(&config.socket_path, &request)
        .await
        .map_err(|e| anyhow!("{e}"))
        .context("daemon is not running (start it with `vc start`)")
}

/// Locate the `vcd` binary next to this `vc` binary, falling back to `$PATH`.
fn find_vcd_binary() -> Result<std::path::PathBuf> {
    let candidate = std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join("vcd")));
    match candidate {
        Some(path) if path.exists() => Ok(path),
        _ => Ok(std::path::PathBuf::from("vcd")),
    }
}

/// Spawn `vcd` detached, redirecting its own stdio to `/dev/null` since it
/// writes its log through `VC_STATE_DIR`'s `daemon.log`, then poll the
/// control socket until it answers or a short startup window elapses.
pub async fn start_daemon(config: &Config) -> Result<()> {
    if send(config, ControlRequest::Status).await.is_ok() {
        println!("daemon already running");
        return Ok(());
    }

    let binary = find_vcd_binary()?;
    std::process::Command::new(&binary)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn {}", binary.display()))?;

    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if send(config, ControlRequest::Status).await.is_ok() {
            println!("daemon started");
            return Ok(());
        }
    }
    Err(anyhow!("daemon did not become ready within the startup window"))
}

/// Send SIGTERM to the PID recorded in the lock file; the daemon's own
/// signal handler then runs the ordered shutdown protocol (§5).
pub async fn stop_daemon(config: &Config) -> Result<()> {
    let pid_raw = match std::fs::read_to_string(&config.lock_path) {
        Ok(raw) => raw,
        Err(_) => {
            println!("daemon not running");
            return Ok(());
        }
    };
    let pid: u32 = pid_raw.trim().parse().context("lock file did not contain a valid pid")?;

    let status = std::process::Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .status()
        .context("failed to invoke kill")?;
    if !status.success() {
        println!("daemon not running");
        return Ok(());
    }

    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if send(config, ControlRequest::Status).await.is_err() {
            println!("daemon stopped");
            return Ok(());
        }
    }
    Err(anyhow!("daemon did not stop within the shutdown grace period"))
}
