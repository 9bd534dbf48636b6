// SPDX-License-Identifier: MIT

//! Control-socket listener (§6.2): accepts one connection per request,
//! decodes a newline-delimited JSON [`ControlRequest`] via `vc-wire`,
//! dispatches against the running executor's shared state, and writes back
//! a [`ControlResponse`].

use crate::shutdown::Shutdown;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};
use vc_core::{ExecutorId, InterruptedBy};
use vc_engine::InterruptManager;
use vc_store::TrackerStore;
use vc_wire::{ControlRequest, ControlResponse, InterruptedSummary};

/// Everything a control-socket request needs to answer (§6.2). Shared,
/// cheaply clonable (every field is an `Arc`/`Clone` type already).
#[derive(Clone)]
pub struct ControlState<S: TrackerStore> {
    pub store: Arc<S>,
    pub interrupts: InterruptManager,
    pub executor_id: ExecutorId,
    pub hostname: String,
    pub pid: u32,
    pub version: String,
    pub started_at: Instant,
}

impl<S: TrackerStore> ControlState<S> {
    /// The issue id this executor is currently driving through the state
    /// machine, if any. The dispatcher tracks at most one issue at a time
    /// (§4.1: one claim per tick, run to completion before the next).
    fn current_issue(&self) -> Option<vc_core::IssueId> {
        self.interrupts.tracked_issues().into_iter().next()
    }

    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::Status => ControlResponse::Status {
                executor_id: self.executor_id.clone(),
                hostname: self.hostname.clone(),
                pid: self.pid,
                version: self.version.clone(),
                uptime_secs: self.started_at.elapsed().as_secs(),
                current_issue: self.current_issue(),
            },
            ControlRequest::Pause { issue_id, reason } => self.pause(issue_id, reason).await,
            ControlRequest::Resume { issue_id } => self.resume(issue_id).await,
            ControlRequest::ListInterrupted => self.list_interrupted().await,
        }
    }

    async fn pause(&self, issue_id: vc_core::IssueId, reason: String) -> ControlResponse {
        match self.current_issue() {
            None => ControlResponse::no_task_currently_executing(),
            Some(current) if current != issue_id => ControlResponse::issue_not_currently_executing(&issue_id, &current),
            Some(_) => {
                if self.interrupts.request(&issue_id, InterruptedBy::ControlCli, reason.clone()) {
                    ControlResponse::InterruptRequested { issue_id, reason }
                } else {
                    // Raced with the issue finishing between the check above
                    // and the request call; report it truthfully rather than
                    // claiming success for an interrupt nobody will observe.
                    ControlResponse::no_task_currently_executing()
                }
            }
        }
    }

    async fn resume(&self, issue_id: vc_core::IssueId) -> ControlResponse {
        match self.store.get_interrupt(&issue_id).await {
            Ok(Some(_)) => ControlResponse::Resumed { issue_id },
            Ok(None) => ControlResponse::Error {
                message: format!("issue {issue_id} has no recorded interrupt"),
            },
            Err(e) => ControlResponse::Error { message: e.to_string() },
        }
    }

    async fn list_interrupted(&self) -> ControlResponse {
        match self.store.list_interrupted().await {
            Ok(entries) => ControlResponse::Interrupted {
                issues: entries
                    .into_iter()
                    .map(|m| InterruptedSummary {
                        issue_id: m.issue_id,
                        interrupted_at: m.interrupted_at,
                        interrupted_by: m.interrupted_by,
                        reason: m.reason,
                        execution_state_at_interruption: m.execution_state_at_interruption,
                        resume_count: m.resume_count,
                    })
                    .collect(),
            },
            Err(e) => ControlResponse::Error { message: e.to_string() },
        }
    }
}

/// Bind the control socket, removing any stale file left by a crashed prior
/// incarnation (the lock file, acquired before this, is what actually
/// guards against two live daemons).
pub fn bind(socket_path: &Path) -> std::io::Result<UnixListener> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    UnixListener::bind(socket_path)
}

/// Accept loop: one task per connection, one request per connection (§6.2).
/// Exits as soon as `shutdown` fires, dropping the listener so the socket
/// path can be rebound by the next incarnation.
pub async fn serve<S: TrackerStore + 'static>(listener: UnixListener, state: ControlState<S>, shutdown: Shutdown) {
    loop {
        tokio::select! {
            _ = shutdown.triggered() => {
                info!("control socket accept loop stopping");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_one(stream, &state).await {
                                warn!(error = %e, "control socket connection error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept control socket connection"),
                }
            }
        }
    }
}

async fn serve_one<S: TrackerStore>(stream: UnixStream, state: &ControlState<S>) -> Result<(), vc_wire::ProtocolError> {
    let (read_half, write_half) = stream.into_split();
    let request: ControlRequest = vc_wire::read_message(read_half).await?;
    let response = state.handle(request).await;
    vc_wire::write_message(write_half, &response).await
}

/// Best-effort connect-and-send for CLI clients (also used by in-process
/// tests): write one request, read back one response.
pub async fn send_request(socket_path: &Path, request: &ControlRequest) -> Result<ControlResponse, vc_wire::ProtocolError> {
    let stream = UnixStream::connect(socket_path).await.map_err(vc_wire::ProtocolError::Io)?;
    let (read_half, write_half) = stream.into_split();
    vc_wire::write_message(write_half, request).await?;
    vc_wire::read_message(read_half).await
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
