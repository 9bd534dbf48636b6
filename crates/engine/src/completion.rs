// SPDX-License-Identifier: MIT

//! Epic and mission completion engine (§4.7): when a child issue closes,
//! walk `parent-child` edges upward deciding whether each parent (and,
//! transitively, the mission that eventually contains it) should close too.

use crate::events::EventRecorder;
use crate::oracle::AiSupervisor;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use vc_adapters::VersionControl;
use vc_core::{AgentEventKind, DependencyType, Issue, IssueId, Severity};
use vc_store::TrackerStore;

use crate::gate_worker::NEEDS_QUALITY_GATES;

pub struct CompletionEngine<S: TrackerStore> {
    store: Arc<S>,
    events: EventRecorder<S>,
    oracle: Arc<dyn AiSupervisor>,
    vcs: Arc<dyn VersionControl>,
    repo_root: std::path::PathBuf,
}

impl<S: TrackerStore> CompletionEngine<S> {
    pub fn new(
        store: Arc<S>,
        events: EventRecorder<S>,
        oracle: Arc<dyn AiSupervisor>,
        vcs: Arc<dyn VersionControl>,
        repo_root: std::path::PathBuf,
    ) -> Self {
        Self { store, events, oracle, vcs, repo_root }
    }

    /// Entry point: a child just closed. Reconsider every parent, recursing
    /// upward through as many generations as actually close (§4.7).
    pub async fn on_child_closed(&self, child: &IssueId) {
        let parents = self.store.get_parents(child, DependencyType::ParentChild).await.unwrap_or_default();
        for parent_id in parents {
            self.reconsider(&parent_id).await;
        }
    }

    async fn reconsider(&self, parent_id: &IssueId) {
        let Ok(Some(parent)) = self.store.get_issue(parent_id).await else {
            return;
        };
        if parent.status == vc_core::IssueStatus::Closed {
            return;
        }
        let children = self.store.get_children(parent_id).await.unwrap_or_default();
        if children.is_empty() {
            return;
        }

        let (should_close, fallback) = self.decide(&parent, &children).await;
        if !should_close {
            return;
        }

        if let Err(e) = self.store.close_issue(parent_id).await {
            tracing::warn!(issue = %parent_id, error = %e, "failed to close parent issue");
            return;
        }
        self.events
            .emit_for_issue(
                AgentEventKind::EpicCompleted { epic_id: parent_id.clone(), fallback },
                "epic completed",
                parent_id.clone(),
            )
            .await;

        if parent.is_mission() {
            let _ = self.store.add_label(parent_id, NEEDS_QUALITY_GATES).await;
            self.cleanup_mission_sandbox(parent).await;
        }

        self.on_child_closed(parent_id).await;
    }

    /// Step 3/4 (§4.7): AI assessment when available, conservative
    /// all-children-closed fallback otherwise. Returns `(should_close,
    /// used_fallback)`.
    async fn decide(&self, parent: &Issue, children: &[Issue]) -> (bool, bool) {
        match self.oracle.assess_completion(parent, children).await {
            Ok(assessment) => {
                let comment = format!(
                    "AI assessment ({:.0}% confidence): {}{}",
                    assessment.confidence * 100.0,
                    assessment.reasoning,
                    if assessment.caveats.is_empty() {
                        String::new()
                    } else {
                        format!(" (caveats: {})", assessment.caveats.join("; "))
                    }
                );
                let mut updated = parent.clone();
                updated.comments.push(comment);
                updated.updated_at = Utc::now();
                let _ = self.store.update_issue(updated).await;
                (assessment.should_close, false)
            }
            Err(_) => {
                let all_closed = children.iter().all(|c| c.status == vc_core::IssueStatus::Closed);
                (all_closed, true)
            }
        }
    }

    async fn cleanup_mission_sandbox(&self, mission: Issue) {
        let (Some(sandbox_path), Some(branch_name)) = (mission.mission.sandbox_path.clone(), mission.mission.branch_name.clone()) else {
            return;
        };
        self.events
            .emit_for_issue(AgentEventKind::EpicCleanupStarted { mission_id: mission.id.clone() }, "mission cleanup started", mission.id.clone())
            .await;

        let result = self.vcs.destroy_sandbox(&self.repo_root, Path::new(&sandbox_path), &branch_name).await;
        let error = result.err().map(|e| e.to_string());

        if let Ok(Some(mut fresh)) = self.store.get_issue(&mission.id).await {
            fresh.mission.sandbox_path = None;
            fresh.mission.branch_name = None;
            fresh.updated_at = Utc::now();
            let _ = self.store.update_issue(fresh).await;
        }

        self.events
            .emit_severe(
                AgentEventKind::EpicCleanupCompleted { mission_id: mission.id.clone(), error: error.clone() },
                "mission cleanup completed",
                if error.is_some() { Severity::Warning } else { Severity::Info },
                Some(mission.id),
            )
            .await;
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
