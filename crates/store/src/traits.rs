// SPDX-License-Identifier: MIT

//! `TrackerStore`: the opaque transactional port the core depends on (§6).
//!
//! The store owns the tracker's schema; the core only ever sees the
//! operations below. Every operation documents the idempotency/atomicity
//! contract the distilled spec assigns to it.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use vc_core::{
    AgentEvent, CommitHash, Dependency, DependencyType, EventId, ExecutorId, ExecutorInstance,
    ExecutorStatus, GateBaseline, InterruptMetadata, Issue, IssueId, IssueStatus,
};

/// Filter for `get_ready_work` / `next_ready` (§4.1).
#[derive(Debug, Clone, Default)]
pub struct ReadyWorkFilter {
    pub issue_type: Option<vc_core::IssueType>,
    pub subtype: Option<vc_core::IssueSubtype>,
    pub require_label: Option<String>,
    pub exclude_label: Option<String>,
    pub limit: usize,
}

impl ReadyWorkFilter {
    pub fn single() -> Self {
        Self {
            limit: 1,
            ..Default::default()
        }
    }
}

/// Result of `claim_issue` (§4.1): atomic insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(vc_core::ExecutionStateRow),
    AlreadyClaimed,
}

/// Result of a peer-cleanup sweep (§4.1).
#[derive(Debug, Clone, Default)]
pub struct StaleSweepResult {
    /// Execution-state rows whose owner was cleared and reset to `Pending`.
    pub reclaimed_issues: Vec<IssueId>,
    /// Executor instance ids whose heartbeat was found stale.
    pub stale_executors: Vec<ExecutorId>,
}

#[async_trait]
pub trait TrackerStore: Send + Sync {
    // -- Issue CRUD --
    async fn create_issue(&self, issue: Issue) -> Result<Issue, StoreError>;
    async fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>, StoreError>;
    async fn update_issue(&self, issue: Issue) -> Result<Issue, StoreError>;
    /// Idempotent: closing an already-closed issue succeeds with no change.
    async fn close_issue(&self, id: &IssueId) -> Result<(), StoreError>;
    async fn search_issues(&self, predicate: &dyn Fn(&Issue) -> bool) -> Result<Vec<Issue>, StoreError>;

    // -- Labels (set semantics on (issue, label)) --
    async fn add_label(&self, id: &IssueId, label: &str) -> Result<(), StoreError>;
    async fn remove_label(&self, id: &IssueId, label: &str) -> Result<(), StoreError>;
    async fn list_labels(&self, id: &IssueId) -> Result<Vec<String>, StoreError>;

    // -- Dependencies (directed edges, cycle-checked on `blocks`) --
    async fn add_dependency(&self, dep: Dependency) -> Result<(), StoreError>;
    async fn remove_dependency(&self, issue: &IssueId, depends_on: &IssueId) -> Result<(), StoreError>;
    async fn get_dependencies(&self, issue: &IssueId, kind: DependencyType) -> Result<Vec<Dependency>, StoreError>;
    async fn get_parents(&self, issue: &IssueId, kind: DependencyType) -> Result<Vec<IssueId>, StoreError>;
    async fn get_children(&self, parent: &IssueId) -> Result<Vec<Issue>, StoreError>;

    // -- Dispatcher --
    async fn get_ready_work(&self, filter: ReadyWorkFilter) -> Result<Vec<Issue>, StoreError>;

    // -- Executor instances / heartbeats --
    async fn register_instance(&self, instance: ExecutorInstance) -> Result<(), StoreError>;
    async fn update_heartbeat(&self, id: &ExecutorId, now: DateTime<Utc>) -> Result<(), StoreError>;
    async fn mark_stopped(&self, id: &ExecutorId, now: DateTime<Utc>) -> Result<(), StoreError>;
    async fn get_active_instances(&self) -> Result<Vec<ExecutorInstance>, StoreError>;
    /// Stale-lease reclamation (§4.1): for every execution-state row whose
    /// owner's heartbeat is older than `threshold`, clear the owner, reset
    /// state to `Pending` (checkpoint preserved), and reopen the issue.
    async fn cleanup_stale(&self, threshold: Duration, now: DateTime<Utc>) -> Result<StaleSweepResult, StoreError>;
    /// Peer-cleanup policy (§4.1): delete `stopped` instance rows older than
    /// `age`, keeping the `keep_recent` most recent regardless of age.
    async fn cleanup_stopped_instances(
        &self,
        age: Duration,
        keep_recent: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExecutorId>, StoreError>;

    // -- Claim / execution state --
    /// Atomic insert-if-absent (§4.1, §8 invariant 1).
    async fn claim_issue(&self, issue: &IssueId, instance: &ExecutorId, now: DateTime<Utc>) -> Result<ClaimOutcome, StoreError>;
    async fn update_execution_state(&self, row: vc_core::ExecutionStateRow) -> Result<(), StoreError>;
    async fn get_execution_state(&self, issue: &IssueId) -> Result<Option<vc_core::ExecutionStateRow>, StoreError>;
    /// Idempotent: release of a non-existent row is success (§4.2, §8 property 7).
    async fn release_issue(&self, issue: &IssueId) -> Result<(), StoreError>;
    /// Release plus reopen the issue to `open` (interrupt protocol, §4.2).
    async fn release_and_reopen(&self, issue: &IssueId) -> Result<(), StoreError>;

    // -- Checkpoints --
    async fn save_checkpoint(&self, issue: &IssueId, blob: serde_json::Value) -> Result<(), StoreError>;
    async fn get_checkpoint(&self, issue: &IssueId) -> Result<Option<serde_json::Value>, StoreError>;

    // -- Interrupt metadata --
    async fn save_interrupt(&self, metadata: InterruptMetadata) -> Result<(), StoreError>;
    async fn get_interrupt(&self, issue: &IssueId) -> Result<Option<InterruptMetadata>, StoreError>;
    async fn delete_interrupt(&self, issue: &IssueId) -> Result<(), StoreError>;
    async fn list_interrupted(&self) -> Result<Vec<InterruptMetadata>, StoreError>;

    // -- Gate baseline cache (database tier) --
    async fn set_gate_baseline(&self, baseline: GateBaseline) -> Result<(), StoreError>;
    async fn get_gate_baseline(&self, commit_hash: &CommitHash) -> Result<Option<GateBaseline>, StoreError>;
    async fn invalidate_gate_baseline(&self, commit_hash: &CommitHash) -> Result<(), StoreError>;

    // -- Agent events --
    async fn store_agent_event(&self, event: AgentEvent) -> Result<(), StoreError>;
    async fn get_agent_events(&self, issue: Option<&IssueId>, limit: usize) -> Result<Vec<AgentEvent>, StoreError>;
    async fn cleanup_events_by_age(&self, max_age: Duration, max_age_critical: Duration, now: DateTime<Utc>) -> Result<usize, StoreError>;
    async fn cleanup_events_per_issue(&self, max_per_issue: usize) -> Result<usize, StoreError>;
    async fn cleanup_events_global(&self, max_global: usize) -> Result<usize, StoreError>;
    async fn get_event_counts(&self) -> Result<(usize, usize), StoreError>;
    /// Compact on-disk storage after retention has pruned entries; best-effort.
    async fn vacuum(&self) -> Result<(), StoreError>;

    // -- Mission fields on an epic --
    async fn create_mission(&self, issue: Issue, sandbox_path: String, branch_name: String) -> Result<Issue, StoreError>;
    async fn get_mission(&self, id: &IssueId) -> Result<Option<Issue>, StoreError>;
    async fn update_mission(&self, issue: Issue) -> Result<Issue, StoreError>;
    async fn get_mission_for_task(&self, task: &IssueId) -> Result<Option<Issue>, StoreError>;
}

/// Helper: reopen an issue's status to `open`, bumping `updated_at`.
pub(crate) fn reopened(mut issue: Issue, now: DateTime<Utc>) -> Issue {
    issue.status = IssueStatus::Open;
    issue.updated_at = now;
    issue
}
