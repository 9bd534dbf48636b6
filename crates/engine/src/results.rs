// SPDX-License-Identifier: MIT

//! Results processor: quality gates and the rollback protocol (§4.4).
//!
//! `run_gates` is a thin wrapper kept separate from [`crate::state_machine`]
//! so the gate-worker lane (§4.6) can share the exact same rollback/failure
//! construction the main dispatcher uses.

use crate::events::EventRecorder;
use std::path::Path;
use tracing::warn;
use vc_adapters::{GateError, GateProvider, VersionControl};
use vc_core::{AgentEventKind, GateResult, Issue, RollbackStage};
use vc_store::TrackerStore;

/// Result of one `GateProvider::run_all` call, plus the derived failure data
/// the rollback protocol needs (§4.4 step 1).
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub results: Vec<GateResult>,
    pub all_passed: bool,
}

impl GateOutcome {
    /// Names of gates that failed, in run order.
    pub fn failed_gates(&self) -> Vec<String> {
        self.results.iter().filter(|r| !r.passed).map(|r| r.gate_name.clone()).collect()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Human-readable concatenation of failing gates' output, excluding
    /// successful gates (§4.4 step 1, S4: `"test Gate Failure"` present,
    /// `"lint Gate Failure"` absent when only `test` fails).
    pub fn full_logs(&self) -> String {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| {
                let error = r.error.as_deref().unwrap_or("");
                format!("=== {} ===\n{}\n{}\n", r.gate_name, error, r.output)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn run_gates(provider: &dyn GateProvider, cwd: &Path) -> Result<GateOutcome, GateError> {
    let (results, all_passed) = provider.run_all(cwd).await?;
    Ok(GateOutcome { results, all_passed })
}

/// Rollback protocol on gate failure (§4.4): capture failure logs, label the
/// issue, hard-reset the working tree, and emit the started /
/// log-preserved / reset-{success,failure} event sequence. All steps are
/// best-effort — callers release the execution-state row after this
/// returns, matching §4.2's failure semantics.
pub async fn rollback<S: TrackerStore>(
    store: &S,
    events: &EventRecorder<S>,
    vcs: &dyn VersionControl,
    issue: &mut Issue,
    cwd: &Path,
    outcome: GateOutcome,
) {
    let failed_gates = outcome.failed_gates();
    let failure_count = outcome.failure_count();
    let full_logs = outcome.full_logs();

    events
        .emit_for_issue(
            AgentEventKind::QualityGatesRollback {
                stage: RollbackStage::Started,
                reset_ok: false,
            },
            format!("rollback started: {failure_count} gate(s) failed"),
            issue.id.clone(),
        )
        .await;

    if let Err(e) = store.add_label(&issue.id, "quality-gates-failed").await {
        warn!(issue = %issue.id, error = %e, "failed to add quality-gates-failed label");
    }

    issue
        .comments
        .push(format!("Quality gates failed ({failure_count} failing): {}\n{full_logs}", failed_gates.join(", ")));
    if let Err(e) = store.update_issue(issue.clone()).await {
        warn!(issue = %issue.id, error = %e, "failed to persist rollback error comment");
    }
    events
        .emit_for_issue(
            AgentEventKind::QualityGatesRollback {
                stage: RollbackStage::LogPreserved,
                reset_ok: false,
            },
            "failure logs preserved on issue",
            issue.id.clone(),
        )
        .await;

    let reset_result = vcs.hard_reset(cwd).await;
    let reset_ok = reset_result.is_ok();
    if let Err(e) = &reset_result {
        warn!(issue = %issue.id, error = %e, "\u{26A0} Automatic rollback failed");
        issue.comments.push(format!("\u{26A0} Automatic rollback failed: {e}"));
        if let Err(e) = store.update_issue(issue.clone()).await {
            warn!(issue = %issue.id, error = %e, "failed to persist rollback-failure comment");
        }
    }
    let stage = if reset_ok { RollbackStage::ResetSuccess } else { RollbackStage::ResetFailure };
    events
        .emit_for_issue(
            AgentEventKind::QualityGatesRollback { stage, reset_ok },
            if reset_ok { "working tree reset to HEAD" } else { "hard reset failed, tree left dirty" },
            issue.id.clone(),
        )
        .await;
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
