// SPDX-License-Identifier: MIT

//! Per-issue execution state machine (§4.2).
//!
//! One [`IssueRunner`] drives one claimed issue linearly through
//! `claimed -> assessing -> executing -> analyzing -> gates -> committing ->
//! completed`, persisting each transition before the next state's side
//! effects run, and honoring interrupts at every boundary (§9's centralized
//! [`InterruptManager`] checkpoint, not scattered flag reads).

use crate::events::EventRecorder;
use crate::interrupt_manager::InterruptManager;
use crate::oracle::AiSupervisor;
use crate::results::{self, GateOutcome};
use chrono::Utc;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vc_adapters::{AgentAdapter, AgentSpawnRequest, GateProvider, VersionControl};
use vc_core::{ContextSnapshot, ExecState, ExecutorId, InterruptMetadata, Issue, IssueId};
use vc_store::TrackerStore;

/// Terminal outcome of one attempt (§4.2: "branches are encoded as terminal
/// outcomes, not as alternative paths").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Reached `completed`; the issue was closed (or left open per AI/fallback).
    Completed { issue_closed: bool },
    /// Released after a failure (spawn error, nonzero exit, gate failure, store error).
    Released { reason: String },
    /// Paused by an observed interrupt; execution state released and issue reopened.
    Paused,
}

/// Everything one [`IssueRunner`] needs, grouped so `Dispatcher` can build
/// one per tick without threading a dozen parameters through.
pub struct RunnerConfig {
    pub agent_binary: String,
    pub agent_timeout: Duration,
    pub streaming_json: bool,
    pub auto_commit: bool,
    /// `{issue_id}` and `{title}` are substituted.
    pub commit_message_template: String,
    /// Fallback working directory when the issue has no mission sandbox.
    pub repo_path: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            agent_binary: "claude".to_string(),
            agent_timeout: vc_adapters::subprocess::AGENT_TIMEOUT,
            streaming_json: false,
            auto_commit: true,
            commit_message_template: "Close {issue_id}: {title}".to_string(),
            repo_path: PathBuf::from("."),
        }
    }
}

/// Drives one issue through the linear state sequence (§4.2).
pub struct IssueRunner<S: TrackerStore> {
    store: Arc<S>,
    events: EventRecorder<S>,
    interrupts: InterruptManager,
    agent: Arc<dyn AgentAdapter>,
    gates: Arc<dyn GateProvider>,
    vcs: Arc<dyn VersionControl>,
    oracle: Arc<dyn AiSupervisor>,
    config: Arc<RunnerConfig>,
}

impl<S: TrackerStore> IssueRunner<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<S>,
        events: EventRecorder<S>,
        interrupts: InterruptManager,
        agent: Arc<dyn AgentAdapter>,
        gates: Arc<dyn GateProvider>,
        vcs: Arc<dyn VersionControl>,
        oracle: Arc<dyn AiSupervisor>,
        config: Arc<RunnerConfig>,
    ) -> Self {
        Self {
            store,
            events,
            interrupts,
            agent,
            gates,
            vcs,
            oracle,
            config,
        }
    }

    fn working_dir(&self, issue: &Issue) -> PathBuf {
        issue
            .mission
            .sandbox_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.config.repo_path.clone())
    }

    async fn advance(&self, issue_id: &IssueId, state: ExecState, owner: ExecutorId) -> Result<(), String> {
        let now = Utc::now();
        let mut row = self
            .store
            .get_execution_state(issue_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "execution state row missing mid-attempt".to_string())?;
        row.state = state;
        row.owner = Some(owner);
        row.updated_at = now;
        self.store.update_execution_state(row).await.map_err(|e| e.to_string())
    }

    async fn checkpoint(&self, issue_id: &IssueId, blob: serde_json::Value) {
        if let Err(e) = self.store.save_checkpoint(issue_id, blob).await {
            warn!(issue = %issue_id, error = %e, "failed to persist checkpoint");
        }
    }

    /// Check the interrupt manager at a state boundary; if a pause is
    /// pending, persist metadata, label, release-and-reopen, and return the
    /// terminal `Paused` outcome (§4.2 pause/resume protocol).
    async fn check_interrupt(&self, issue: &Issue, at_state: ExecState) -> Option<RunOutcome> {
        if !self.interrupts.is_requested(&issue.id) {
            return None;
        }
        let pending = self.interrupts.take(&issue.id)?;
        let snapshot = ContextSnapshot::default();
        let metadata = InterruptMetadata::new(
            issue.id.clone(),
            pending.interrupted_by,
            pending.reason,
            at_state,
            snapshot,
            Utc::now(),
        );
        if let Err(e) = self.store.save_interrupt(metadata).await {
            warn!(issue = %issue.id, error = %e, "failed to persist interrupt metadata");
        }
        if let Err(e) = self.store.add_label(&issue.id, "interrupted").await {
            warn!(issue = %issue.id, error = %e, "failed to add interrupted label");
        }
        if let Err(e) = self.store.release_and_reopen(&issue.id).await {
            warn!(issue = %issue.id, error = %e, "failed to release on interrupt");
        }
        self.interrupts.untrack(&issue.id);
        info!(issue = %issue.id, "execution paused by interrupt");
        Some(RunOutcome::Paused)
    }

    /// Resume protocol (§4.2): if interrupt metadata exists for this issue,
    /// bump `resume_count`, clear the `interrupted` label, and synthesize a
    /// resume-context string for the agent's next prompt.
    async fn resume_context(&self, issue_id: &IssueId) -> Option<String> {
        let mut metadata = self.store.get_interrupt(issue_id).await.ok().flatten()?;
        metadata.mark_resumed(Utc::now());
        let context = metadata.resume_context();
        if let Err(e) = self.store.save_interrupt(metadata).await {
            warn!(issue = %issue_id, error = %e, "failed to persist resume bump");
        }
        if let Err(e) = self.store.remove_label(issue_id, "interrupted").await {
            warn!(issue = %issue_id, error = %e, "failed to clear interrupted label on resume");
        }
        Some(context)
    }

    /// Failure path (§4.2, §7): add an error comment, release the execution
    /// state row (deleting it), and do not advance issue status. Release is
    /// idempotent — a row already cleared by stale reclamation is fine.
    async fn fail(&self, issue: &mut Issue, reason: String) -> RunOutcome {
        warn!(issue = %issue.id, reason = %reason, "execution attempt failed");
        issue.comments.push(format!("Execution error: {reason}"));
        if let Err(e) = self.store.update_issue(issue.clone()).await {
            warn!(issue = %issue.id, error = %e, "failed to persist error comment");
        }
        if let Err(e) = self.store.release_issue(&issue.id).await {
            warn!(issue = %issue.id, error = %e, "release after failure errored (treated as noop)");
        }
        self.interrupts.untrack(&issue.id);
        RunOutcome::Released { reason }
    }

    /// Drive `issue` (already claimed, row state `Claimed`) through the full
    /// sequence. `owner` is this process's executor id.
    pub async fn run(&self, mut issue: Issue, owner: ExecutorId) -> RunOutcome {
        self.interrupts.track(&issue.id);

        // claimed -> assessing: optional AI pre-assessment. Failure is
        // non-fatal; the transition proceeds regardless (§4.2).
        if let Some(outcome) = self.check_interrupt(&issue, ExecState::Claimed).await {
            return outcome;
        }
        let resume_context = self.resume_context(&issue.id).await;
        match self.oracle.pre_assess(&issue).await {
            Ok(assessment) => {
                self.checkpoint(&issue.id, json!({"state": "assessing", "pre_assessment": assessment})).await;
            }
            Err(e) => {
                info!(issue = %issue.id, error = %e, "pre-assessment unavailable, proceeding without it");
            }
        }
        if let Err(e) = self.advance(&issue.id, ExecState::Assessing, owner.clone()).await {
            return self.fail(&mut issue, e).await;
        }

        // assessing -> executing: spawn the coding-agent subprocess.
        if let Some(outcome) = self.check_interrupt(&issue, ExecState::Assessing).await {
            return outcome;
        }
        if let Err(e) = self.advance(&issue.id, ExecState::Executing, owner.clone()).await {
            return self.fail(&mut issue, e).await;
        }
        let mut prompt = format!("{}\n\n{}", issue.title, issue.description);
        if let Some(ctx) = resume_context {
            prompt.push_str("\n\n");
            prompt.push_str(&ctx);
        }
        let working_dir = self.working_dir(&issue);
        let request = AgentSpawnRequest {
            prompt,
            working_dir,
            streaming_json: self.config.streaming_json,
        };
        let agent_result = match self.agent.run(&self.config.agent_binary, request, self.config.agent_timeout).await {
            Ok(result) => result,
            Err(e) => return self.fail(&mut issue, format!("agent subprocess error: {e}")).await,
        };
        if agent_result.exit_code != Some(0) {
            return self
                .fail(
                    &mut issue,
                    format!("agent exited with {:?}: {}", agent_result.exit_code, agent_result.stderr_sample),
                )
                .await;
        }

        // executing -> analyzing: capture the execution-attempt record.
        if let Err(e) = self.advance(&issue.id, ExecState::Analyzing, owner.clone()).await {
            return self.fail(&mut issue, e).await;
        }
        self.checkpoint(
            &issue.id,
            json!({
                "state": "analyzing",
                "exit_code": agent_result.exit_code,
                "stdout_sample": agent_result.stdout_sample,
                "stderr_sample": agent_result.stderr_sample,
                "completed_at": agent_result.completed_at,
            }),
        )
        .await;

        // analyzing -> gates: AI analysis of agent output and working tree.
        if let Some(outcome) = self.check_interrupt(&issue, ExecState::Analyzing).await {
            return outcome;
        }
        let acceptance_met = match self
            .oracle
            .analyze_execution(&issue, &agent_result.stdout_sample, &agent_result.stderr_sample)
            .await
        {
            Ok(analysis) => {
                issue.comments.push(format!("Execution analysis: {}", analysis.summary));
                Some(analysis.acceptance_criteria_met)
            }
            Err(e) => {
                info!(issue = %issue.id, error = %e, "analysis unavailable, fallback applies at commit time");
                None
            }
        };
        if let Err(e) = self.advance(&issue.id, ExecState::Gates, owner.clone()).await {
            return self.fail(&mut issue, e).await;
        }

        // gates -> committing: run quality gates; on failure, roll back (§4.4).
        if let Some(outcome) = self.check_interrupt(&issue, ExecState::Gates).await {
            return outcome;
        }
        let working_dir = self.working_dir(&issue);
        let gate_outcome = match results::run_gates(self.gates.as_ref(), &working_dir).await {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(&mut issue, format!("gate execution error: {e}")).await,
        };
        if !gate_outcome.all_passed {
            return self.roll_back(&mut issue, &working_dir, gate_outcome).await;
        }
        if let Err(e) = self.advance(&issue.id, ExecState::Committing, owner.clone()).await {
            return self.fail(&mut issue, e).await;
        }

        // committing -> completed: commit (if enabled) and close if warranted.
        if self.config.auto_commit {
            let message = self
                .config
                .commit_message_template
                .replace("{issue_id}", issue.id.as_str())
                .replace("{title}", &issue.title);
            if let Err(e) = self.vcs.commit_all(&working_dir, &message).await {
                warn!(issue = %issue.id, error = %e, "auto-commit failed, leaving changes staged");
            }
        }
        let should_close = acceptance_met.unwrap_or(true);
        if should_close {
            if let Err(e) = self.store.close_issue(&issue.id).await {
                warn!(issue = %issue.id, error = %e, "failed to close issue after successful attempt");
            }
        }
        if let Err(e) = self.store.update_issue(issue.clone()).await {
            warn!(issue = %issue.id, error = %e, "failed to persist analysis comments");
        }
        if let Err(e) = self.advance(&issue.id, ExecState::Completed, owner).await {
            warn!(issue = %issue.id, error = %e, "failed to persist terminal completed state");
        }
        if let Err(e) = self.store.release_issue(&issue.id).await {
            warn!(issue = %issue.id, error = %e, "release after completion errored (treated as noop)");
        }
        self.interrupts.untrack(&issue.id);
        RunOutcome::Completed { issue_closed: should_close }
    }

    async fn roll_back(&self, issue: &mut Issue, working_dir: &Path, outcome: GateOutcome) -> RunOutcome {
        results::rollback(self.store.as_ref(), &self.events, self.vcs.as_ref(), issue, working_dir, outcome).await;
        if let Err(e) = self.store.release_issue(&issue.id).await {
            warn!(issue = %issue.id, error = %e, "release after rollback errored (treated as noop)");
        }
        self.interrupts.untrack(&issue.id);
        RunOutcome::Released {
            reason: "quality gates failed".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
