// SPDX-License-Identifier: MIT

//! Dispatcher & lease manager (§4.1): the outermost poll loop. Generic over
//! [`Clock`] (unlike the other engine components, which call `Utc::now()`
//! directly) because heartbeat/TTL timing is exactly the kind of thing a
//! `FakeClock` needs to make deterministic in tests.

use crate::preflight::DegradedModeGate;
use crate::state_machine::{IssueRunner, RunOutcome};
use chrono::{Duration, Utc};
use std::sync::Arc;
use vc_core::{Clock, ExecutorId, ExecutorInstance};
use vc_store::{ClaimOutcome, ReadyWorkFilter, StaleSweepResult, TrackerStore};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub hostname: String,
    pub pid: u32,
    pub version: String,
    pub stale_threshold: Duration,
    pub stopped_instance_age: Duration,
    pub keep_recent_instances: usize,
}

/// Outcome of a single dispatch tick (§4.1): at most one issue claimed and
/// run per tick, by design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    AlreadyClaimedElsewhere,
    /// §4.5: a pre-flight degraded-mode system issue is open under
    /// `failure_mode=block`; this tick claimed nothing on purpose.
    BlockedDegraded,
    Ran(RunOutcomeSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcomeSummary {
    pub issue_id: vc_core::IssueId,
    pub outcome_kind: &'static str,
}

pub struct Dispatcher<S: TrackerStore, C: Clock> {
    store: Arc<S>,
    runner: Arc<IssueRunner<S>>,
    clock: C,
    owner: ExecutorId,
    config: DispatcherConfig,
    degraded: Option<DegradedModeGate>,
}

impl<S: TrackerStore, C: Clock> Dispatcher<S, C> {
    pub fn new(store: Arc<S>, runner: Arc<IssueRunner<S>>, clock: C, owner: ExecutorId, config: DispatcherConfig) -> Self {
        Self { store, runner, clock, owner, config, degraded: None }
    }

    /// Wire in the pre-flight checker's shared block/unblock flag (§4.5).
    /// Without this, the dispatcher always claims regardless of degraded
    /// mode — the default for executors that run with pre-flight disabled.
    pub fn with_degraded_gate(mut self, gate: DegradedModeGate) -> Self {
        self.degraded = Some(gate);
        self
    }

    /// §4.1 `register`: must precede any claim.
    pub async fn register(&self) -> Result<(), String> {
        let instance = ExecutorInstance::new(self.owner.clone(), self.config.hostname.clone(), self.config.pid, self.config.version.clone(), self.clock.utc_now());
        self.store.register_instance(instance).await.map_err(|e| e.to_string())
    }

    /// Best-effort heartbeat renewal; failures are logged, not fatal (§4.1).
    pub async fn heartbeat(&self) {
        if let Err(e) = self.store.update_heartbeat(&self.owner, self.clock.utc_now()).await {
            tracing::warn!(error = %e, "heartbeat renewal failed");
        }
    }

    /// One full tick: heartbeat, select at most one ready issue, claim it,
    /// hand it to the state machine.
    pub async fn tick(&self) -> Result<TickOutcome, String> {
        self.heartbeat().await;

        if self.degraded.as_ref().is_some_and(DegradedModeGate::is_blocked) {
            return Ok(TickOutcome::BlockedDegraded);
        }

        let ready = self.store.get_ready_work(ReadyWorkFilter::single()).await.map_err(|e| e.to_string())?;
        let Some(issue) = ready.into_iter().next() else {
            return Ok(TickOutcome::Idle);
        };

        match self.store.claim_issue(&issue.id, &self.owner, self.clock.utc_now()).await {
            Ok(ClaimOutcome::Claimed(_)) => {}
            Ok(ClaimOutcome::AlreadyClaimed) => return Ok(TickOutcome::AlreadyClaimedElsewhere),
            Err(e) => return Err(e.to_string()),
        }

        let issue_id = issue.id.clone();
        let outcome = self.runner.run(issue, self.owner.clone()).await;
        let kind = match outcome {
            RunOutcome::Completed { issue_closed: true } => "completed_closed",
            RunOutcome::Completed { issue_closed: false } => "completed_open",
            RunOutcome::Released { .. } => "released",
            RunOutcome::Paused => "paused",
        };
        Ok(TickOutcome::Ran(RunOutcomeSummary { issue_id, outcome_kind: kind }))
    }

    /// Stale-lease reclamation (§4.1): runs at startup and on a dedicated
    /// ticker (`VC_STALE_SWEEP_INTERVAL`, §9 addition).
    pub async fn sweep_stale(&self) -> Result<StaleSweepResult, String> {
        self.store.cleanup_stale(self.config.stale_threshold, self.clock.utc_now()).await.map_err(|e| e.to_string())
    }

    /// Peer-cleanup policy at shutdown (§4.1): delete `stopped` instance
    /// rows older than a configured age, keeping the N most recent.
    pub async fn cleanup_peers(&self) -> Result<Vec<ExecutorId>, String> {
        self.store
            .cleanup_stopped_instances(self.config.stopped_instance_age, self.config.keep_recent_instances, self.clock.utc_now())
            .await
            .map_err(|e| e.to_string())
    }

    /// Mark this instance stopped (part of the shutdown protocol, §4.9).
    pub async fn mark_stopped(&self) {
        if let Err(e) = self.store.mark_stopped(&self.owner, self.clock.utc_now()).await {
            tracing::warn!(error = %e, "failed to mark executor instance stopped");
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
