// SPDX-License-Identifier: MIT

//! Pre-flight baseline checker (§4.5): a two-tier, commit-hash-keyed cache
//! of whether the working tree's current commit passes all quality gates,
//! with a degraded-mode fallback that blocks new work on persistent
//! failures.

use crate::events::EventRecorder;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vc_adapters::{GateProvider, VcsError, VersionControl};
use vc_core::{AgentEventKind, CacheType, CommitHash, GateBaseline, GateResult, Issue, IssueId, IssueStatus, IssueType, Severity};
use vc_store::TrackerStore;

/// Shared flag set by [`PreflightChecker`] and read by the [`Dispatcher`](crate::Dispatcher):
/// while degraded-mode system issues are open under `failure_mode=block`,
/// the dispatcher SHOULD refuse to claim new work (§4.5).
#[derive(Clone, Default)]
pub struct DegradedModeGate {
    blocked: Arc<AtomicBool>,
}

impl DegradedModeGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    pub(crate) fn set(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }
}

/// How the executor should react while a degraded-mode system issue is open
/// (§4.5): block new claims, warn but proceed, or silently ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Block,
    Warn,
    Ignore,
}

#[derive(Debug, Clone)]
struct CachedBaseline {
    baseline: GateBaseline,
}

pub struct PreflightChecker<S: TrackerStore> {
    store: Arc<S>,
    events: EventRecorder<S>,
    gates: Arc<dyn GateProvider>,
    vcs: Arc<dyn VersionControl>,
    memory: RwLock<HashMap<CommitHash, CachedBaseline>>,
    ttl: Duration,
    failure_mode: FailureMode,
    gate: DegradedModeGate,
}

/// Outcome of a single pre-flight run: whether the baseline passed, and
/// whether new work should be blocked per `failure_mode` (§4.5).
#[derive(Debug, Clone)]
pub struct PreflightOutcome {
    pub all_passed: bool,
    pub should_block: bool,
    pub failing_gates: Vec<String>,
}

impl<S: TrackerStore> PreflightChecker<S> {
    pub fn new(
        store: Arc<S>,
        events: EventRecorder<S>,
        gates: Arc<dyn GateProvider>,
        vcs: Arc<dyn VersionControl>,
        ttl: Duration,
        failure_mode: FailureMode,
    ) -> Self {
        Self {
            store,
            events,
            gates,
            vcs,
            memory: RwLock::new(HashMap::new()),
            ttl,
            failure_mode,
            gate: DegradedModeGate::new(),
        }
    }

    /// A clone of the shared block/unblock flag this checker updates after
    /// every run; wire this into the [`Dispatcher`](crate::Dispatcher) so a
    /// `failure_mode=block` degraded mode actually stops new claims.
    pub fn gate(&self) -> DegradedModeGate {
        self.gate.clone()
    }

    /// Run the full algorithm from §4.5: resolve HEAD, consult memory cache,
    /// then the database tier, then run gates on a full miss.
    pub async fn check(&self, repo_path: &Path) -> Result<PreflightOutcome, VcsError> {
        let started = Utc::now();
        self.events.emit(AgentEventKind::PreFlightCheckStarted, "pre-flight check started").await;

        let (commit_hash, branch_name) = self.vcs.resolve_head(repo_path).await?;
        let now = Utc::now();

        if let Some(cached) = self.memory.read().get(&commit_hash).cloned() {
            if cached.baseline.is_fresh(now, self.ttl) {
                let age = now.signed_duration_since(cached.baseline.timestamp).num_seconds();
                self.events
                    .emit(
                        AgentEventKind::BaselineCacheHit {
                            cache_type: CacheType::Memory,
                            age_secs: age,
                        },
                        "baseline cache hit (memory)",
                    )
                    .await;
                return Ok(self.finish(started, cached.baseline).await);
            }
        }

        if let Some(db_baseline) = self.store.get_gate_baseline(&commit_hash).await.unwrap_or(None) {
            if db_baseline.is_fresh(now, self.ttl) {
                let age = now.signed_duration_since(db_baseline.timestamp).num_seconds();
                self.memory.write().insert(commit_hash.clone(), CachedBaseline { baseline: db_baseline.clone() });
                self.events
                    .emit(
                        AgentEventKind::BaselineCacheHit {
                            cache_type: CacheType::Database,
                            age_secs: age,
                        },
                        "baseline cache hit (database)",
                    )
                    .await;
                return Ok(self.finish(started, db_baseline).await);
            }
            let _ = self.store.invalidate_gate_baseline(&commit_hash).await;
        }

        self.events.emit(AgentEventKind::BaselineCacheMiss, "baseline cache miss, running gates").await;
        // Each gate is already bounded by its own timeout inside the `GateProvider`
        // (see `ShellGateProvider::run_all`); there is deliberately no second,
        // whole-set timeout here; a run that times out or errors must come back
        // as a *failing* baseline, never as the vacuous "all passed" of an empty
        // result set (§4.5).
        let results = match self.gates.run_all(repo_path).await {
            Ok((results, _)) => results,
            Err(e) => vec![GateResult {
                gate_name: "pre-flight".to_string(),
                passed: false,
                output: String::new(),
                error: Some(e.to_string()),
            }],
        };
        let baseline = GateBaseline::new(commit_hash.clone(), branch_name, results, now);

        self.memory.write().insert(commit_hash.clone(), CachedBaseline { baseline: baseline.clone() });
        let _ = self.store.set_gate_baseline(baseline.clone()).await;

        Ok(self.finish(started, baseline).await)
    }

    async fn finish(&self, started: DateTime<Utc>, baseline: GateBaseline) -> PreflightOutcome {
        let failing: Vec<String> = baseline.failing_gates().into_iter().map(|g| g.gate_name.clone()).collect();
        let duration_ms = Utc::now().signed_duration_since(started).num_milliseconds().max(0) as u64;
        self.events
            .emit(
                AgentEventKind::PreFlightCheckCompleted {
                    duration_ms,
                    failing_gates: failing.clone(),
                },
                "pre-flight check completed",
            )
            .await;

        if !baseline.all_passed {
            self.events
                .emit_severe(
                    AgentEventKind::ExecutorDegradedMode {
                        failing_gates: failing.clone(),
                    },
                    "entering degraded mode",
                    Severity::Warning,
                    None,
                )
                .await;
            self.upsert_degraded_issues(&baseline).await;
        }

        let should_block = !baseline.all_passed && self.failure_mode == FailureMode::Block;
        self.gate.set(should_block);
        PreflightOutcome {
            all_passed: baseline.all_passed,
            should_block,
            failing_gates: failing,
        }
    }

    /// Degraded-mode upsert (§4.5): one stable system issue per failing
    /// gate, reopened with updated notes if it already exists and is closed.
    async fn upsert_degraded_issues(&self, baseline: &GateBaseline) {
        for result in baseline.failing_gates() {
            let id = IssueId::from_str_id(format!("vc-baseline-{}", result.gate_name));
            let truncated: String = result.output.chars().take(2000).collect();

            match self.store.get_issue(&id).await.unwrap_or(None) {
                Some(mut existing) => {
                    if existing.status == IssueStatus::Closed {
                        existing.status = IssueStatus::Open;
                        existing.comments.push(format!("Gate failed again: {truncated}"));
                        existing.updated_at = Utc::now();
                        let _ = self.store.update_issue(existing).await;
                    }
                    // Already open: do nothing (§4.5: idempotent upsert).
                }
                None => {
                    let mut issue = Issue::new(id, format!("Baseline gate failure: {}", result.gate_name), Utc::now());
                    issue.issue_type = IssueType::Bug;
                    issue.priority = 1;
                    issue.description = truncated;
                    issue.labels.insert(format!("gate:{}", result.gate_name));
                    issue.labels.insert("baseline-failure".to_string());
                    issue.labels.insert("system".to_string());
                    let _ = self.store.create_issue(issue).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "preflight_tests.rs"]
mod tests;
