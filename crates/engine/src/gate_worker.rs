// SPDX-License-Identifier: MIT

//! Quality-gate worker (§4.6): an independent claim loop that runs
//! concurrently with the main dispatcher, driving missions labeled
//! `needs-quality-gates` through gate execution on their sandbox branch.

use crate::events::EventRecorder;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use vc_adapters::GateProvider;
use vc_core::{Dependency, DependencyType, ExecutorId, Issue, IssueId, IssueStatus, IssueSubtype, IssueType};
use vc_store::{ReadyWorkFilter, TrackerStore};

pub const NEEDS_QUALITY_GATES: &str = "needs-quality-gates";
pub const GATES_RUNNING: &str = "gates-running";
pub const GATES_FAILED: &str = "gates-failed";
pub const NEEDS_REVIEW: &str = "needs-review";

/// Outcome of a single claim-and-run cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateWorkerOutcome {
    /// No mission was ready to claim.
    Idle,
    /// A mission passed every gate.
    Passed { mission_id: IssueId },
    /// A mission failed at least one gate; blocking children were filed.
    Failed { mission_id: IssueId, failing_gates: Vec<String> },
}

/// The independent gate-lane worker (§4.6). Construction requires a real
/// `GateProvider` — there is no variant of this type that can run without
/// one, which is the crate's way of encoding the spec's construction
/// invariant at compile time rather than as a runtime check.
pub struct GateWorker<S: TrackerStore> {
    store: Arc<S>,
    events: EventRecorder<S>,
    gates: Arc<dyn GateProvider>,
    owner: ExecutorId,
}

impl<S: TrackerStore> GateWorker<S> {
    pub fn new(store: Arc<S>, events: EventRecorder<S>, gates: Arc<dyn GateProvider>, owner: ExecutorId) -> Self {
        Self { store, events, gates, owner }
    }

    /// Claim one ready mission (if any) and drive it through gate execution.
    pub async fn run_once(&self) -> Result<GateWorkerOutcome, String> {
        let filter = ReadyWorkFilter {
            issue_type: Some(IssueType::Epic),
            subtype: Some(IssueSubtype::Mission),
            require_label: Some(NEEDS_QUALITY_GATES.to_string()),
            exclude_label: Some(GATES_RUNNING.to_string()),
            limit: 1,
        };
        let ready = self.store.get_ready_work(filter).await.map_err(|e| e.to_string())?;
        let Some(mut mission) = ready.into_iter().next() else {
            return Ok(GateWorkerOutcome::Idle);
        };

        let now = Utc::now();
        match self.store.claim_issue(&mission.id, &self.owner, now).await {
            Ok(vc_store::ClaimOutcome::Claimed(_)) => {}
            Ok(vc_store::ClaimOutcome::AlreadyClaimed) => return Ok(GateWorkerOutcome::Idle),
            Err(e) => return Err(e.to_string()),
        }

        let _ = self.store.add_label(&mission.id, GATES_RUNNING).await;
        mission.labels.insert(GATES_RUNNING.to_string());
        mission.status = IssueStatus::InProgress;
        mission.updated_at = now;
        mission = self.store.update_mission(mission).await.map_err(|e| e.to_string())?;

        let sandbox_path = mission
            .mission
            .sandbox_path
            .clone()
            .ok_or_else(|| format!("mission {} has no sandbox_path", mission.id))?;

        let (results, all_passed) = self
            .gates
            .run_all(Path::new(&sandbox_path))
            .await
            .map(|(r, p)| (r, p))
            .unwrap_or_else(|e| {
                (
                    vec![vc_core::GateResult {
                        gate_name: "gate-worker".to_string(),
                        passed: false,
                        output: String::new(),
                        error: Some(e.to_string()),
                    }],
                    false,
                )
            });

        let outcome = if all_passed {
            self.on_passed(mission).await?
        } else {
            self.on_failed(mission, &results).await?
        };
        let _ = self.store.release_issue(&outcome.mission_id_for_release()).await;
        Ok(outcome.into())
    }

    async fn on_passed(&self, mut mission: Issue) -> Result<InternalOutcome, String> {
        mission.labels.remove(GATES_RUNNING);
        mission.labels.remove(NEEDS_QUALITY_GATES);
        mission.labels.insert(NEEDS_REVIEW.to_string());
        mission.status = IssueStatus::Open;
        mission.updated_at = Utc::now();
        let id = mission.id.clone();
        self.store.update_mission(mission).await.map_err(|e| e.to_string())?;
        self.events.emit_for_issue(vc_core::AgentEventKind::Other, "quality gates passed", id.clone()).await;
        Ok(InternalOutcome::Passed { mission_id: id })
    }

    async fn on_failed(&self, mut mission: Issue, results: &[vc_core::GateResult]) -> Result<InternalOutcome, String> {
        let failing: Vec<&vc_core::GateResult> = results.iter().filter(|r| !r.passed).collect();
        let failing_names: Vec<String> = failing.iter().map(|r| r.gate_name.clone()).collect();

        mission.labels.remove(GATES_RUNNING);
        mission.labels.insert(GATES_FAILED.to_string());
        mission.status = IssueStatus::Blocked;
        mission.updated_at = Utc::now();
        let mission_id = mission.id.clone();
        self.store.update_mission(mission).await.map_err(|e| e.to_string())?;

        for result in &failing {
            let child_id = IssueId::from_str_id(format!("{}-gate-{}", mission_id, result.gate_name));
            if self.store.get_issue(&child_id).await.map_err(|e| e.to_string())?.is_none() {
                let mut child = Issue::new(child_id.clone(), format!("Gate `{}` failing on {}", result.gate_name, mission_id), Utc::now());
                child.issue_type = IssueType::Bug;
                child.description = result.error.clone().unwrap_or_default();
                child.labels.insert(format!("gate:{}", result.gate_name));
                self.store.create_issue(child).await.map_err(|e| e.to_string())?;
            }
            let _ = self
                .store
                .add_dependency(Dependency {
                    issue: mission_id.clone(),
                    depends_on: child_id,
                    dependency_type: DependencyType::Blocks,
                })
                .await;
        }

        self.events
            .emit_for_issue(
                vc_core::AgentEventKind::Other,
                format!("quality gates failed: {}", failing_names.join(", ")),
                mission_id.clone(),
            )
            .await;
        Ok(InternalOutcome::Failed { mission_id, failing_gates: failing_names })
    }
}

enum InternalOutcome {
    Passed { mission_id: IssueId },
    Failed { mission_id: IssueId, failing_gates: Vec<String> },
}

impl InternalOutcome {
    fn mission_id_for_release(&self) -> IssueId {
        match self {
            InternalOutcome::Passed { mission_id } => mission_id.clone(),
            InternalOutcome::Failed { mission_id, .. } => mission_id.clone(),
        }
    }
}

impl From<InternalOutcome> for GateWorkerOutcome {
    fn from(value: InternalOutcome) -> Self {
        match value {
            InternalOutcome::Passed { mission_id } => GateWorkerOutcome::Passed { mission_id },
            InternalOutcome::Failed { mission_id, failing_gates } => GateWorkerOutcome::Failed { mission_id, failing_gates },
        }
    }
}

#[cfg(test)]
#[path = "gate_worker_tests.rs"]
mod tests;
