// SPDX-License-Identifier: MIT

//! Structured event emission (§3, §4.5, §4.7, §4.6). A thin wrapper around
//! `TrackerStore::store_agent_event` so call sites build an [`AgentEvent`]
//! without repeating id generation and best-effort error handling — one
//! narrow emission seam shared by every subsystem.

use std::sync::Arc;
use tracing::warn;
use vc_core::{AgentEvent, AgentEventKind, ExecutorId, IdGen, IssueId, Severity};
use vc_store::TrackerStore;

#[derive(Clone)]
pub struct EventRecorder<S: TrackerStore> {
    store: Arc<S>,
    id_gen: Arc<dyn IdGen>,
    executor_id: ExecutorId,
}

impl<S: TrackerStore> EventRecorder<S> {
    pub fn new(store: Arc<S>, id_gen: Arc<dyn IdGen>, executor_id: ExecutorId) -> Self {
        Self { store, id_gen, executor_id }
    }

    /// Emit an event. Best-effort: storage failures are logged, never
    /// propagated (§7: "all best-effort operations log failures but return
    /// success to their callers").
    pub async fn emit(&self, kind: AgentEventKind, message: impl Into<String>) {
        self.emit_full(kind, message, Severity::Info, None).await;
    }

    pub async fn emit_for_issue(&self, kind: AgentEventKind, message: impl Into<String>, issue_id: IssueId) {
        self.emit_full(kind, message, Severity::Info, Some(issue_id)).await;
    }

    pub async fn emit_severe(&self, kind: AgentEventKind, message: impl Into<String>, severity: Severity, issue_id: Option<IssueId>) {
        self.emit_full(kind, message, severity, issue_id).await;
    }

    async fn emit_full(&self, kind: AgentEventKind, message: impl Into<String>, severity: Severity, issue_id: Option<IssueId>) {
        let mut event = AgentEvent::new(self.id_gen.event_id(), kind, message, chrono::Utc::now())
            .with_severity(severity)
            .with_executor(self.executor_id.clone());
        if let Some(id) = issue_id {
            event = event.with_issue(id);
        }
        if let Err(e) = self.store.store_agent_event(event).await {
            warn!(error = %e, "failed to persist agent event");
        }
    }
}
