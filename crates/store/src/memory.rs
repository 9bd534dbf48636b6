// SPDX-License-Identifier: MIT

//! `MemoryStore`: the default production-grade [`TrackerStore`] adapter.
//!
//! A `parking_lot::RwLock<MaterializedState>` materialized view, durable via
//! a WAL-plus-snapshot pair on disk. The store's schema is a non-goal (§6);
//! this is one conforming implementation of the [`TrackerStore`] port, not
//! the spec itself.

use crate::error::StoreError;
use crate::snapshot::Snapshot;
use crate::state::MaterializedState;
use crate::traits::{reopened, ClaimOutcome, ReadyWorkFilter, StaleSweepResult, TrackerStore};
use crate::wal::{Wal, WalEntry};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vc_core::{
    AgentEvent, CommitHash, Dependency, DependencyType, EventId, ExecutorId, ExecutorInstance,
    ExecutorStatus, GateBaseline, InterruptMetadata, Issue, IssueId, IssueStatus,
};

pub struct MemoryStore {
    state: Arc<RwLock<MaterializedState>>,
    wal: Arc<Mutex<Wal>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Open (or create) durable storage at `wal_path`, optionally seeded
    /// from a snapshot at `snapshot_path`.
    pub fn open(wal_path: &Path, snapshot_path: Option<&Path>) -> Result<Self, StoreError> {
        let (base_state, skip_seq) = match snapshot_path.map(Snapshot::load).transpose() {
            Ok(Some(Some(snapshot))) => (snapshot.state, snapshot.seq),
            Ok(_) => (MaterializedState::default(), 0),
            Err(e) => return Err(StoreError::Transient(e.to_string())),
        };

        let (wal, entries) = Wal::open(wal_path, skip_seq).map_err(|e| StoreError::Transient(e.to_string()))?;
        let mut state = base_state;
        for entry in entries {
            entry.apply(&mut state);
        }

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            wal: Arc::new(Mutex::new(wal)),
            snapshot_path: snapshot_path.map(Path::to_path_buf),
        })
    }

    /// In-memory only, no durability — for tests that don't need a tempdir.
    pub fn in_memory_for_tests(tmp_dir: &Path) -> Result<Self, StoreError> {
        Self::open(&tmp_dir.join("events.wal"), None)
    }

    /// Write a fresh snapshot of the current state and truncate the WAL.
    /// Best-effort: callers periodically checkpoint to bound WAL growth.
    pub fn checkpoint(&self, now: DateTime<Utc>) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let state = self.state.read().clone();
        let mut wal = self.wal.lock();
        let snapshot = Snapshot::new(wal.seq(), state, now);
        snapshot.save(path).map_err(|e| StoreError::Transient(e.to_string()))?;
        wal.truncate().map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(())
    }

    fn append(&self, entry: WalEntry) -> Result<(), StoreError> {
        self.wal.lock().append(&entry).map_err(|e| StoreError::Transient(e.to_string()))?;
        entry.apply(&mut self.state.write());
        Ok(())
    }
}

#[async_trait]
impl TrackerStore for MemoryStore {
    async fn create_issue(&self, issue: Issue) -> Result<Issue, StoreError> {
        if self.state.read().issues.contains_key(&issue.id) {
            return Err(StoreError::Conflict(format!("issue {} already exists", issue.id)));
        }
        self.append(WalEntry::IssueUpserted { issue: issue.clone() })?;
        Ok(issue)
    }

    async fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>, StoreError> {
        Ok(self.state.read().issues.get(id).cloned())
    }

    async fn update_issue(&self, issue: Issue) -> Result<Issue, StoreError> {
        self.append(WalEntry::IssueUpserted { issue: issue.clone() })?;
        Ok(issue)
    }

    async fn close_issue(&self, id: &IssueId) -> Result<(), StoreError> {
        let Some(mut issue) = self.state.read().issues.get(id).cloned() else {
            return Ok(()); // idempotent: closing a non-existent issue is a no-op success
        };
        if issue.status == IssueStatus::Closed {
            return Ok(());
        }
        issue.status = IssueStatus::Closed;
        self.append(WalEntry::IssueUpserted { issue })
    }

    async fn search_issues(&self, predicate: &dyn Fn(&Issue) -> bool) -> Result<Vec<Issue>, StoreError> {
        Ok(self.state.read().issues.values().filter(|i| predicate(i)).cloned().collect())
    }

    async fn add_label(&self, id: &IssueId, label: &str) -> Result<(), StoreError> {
        let Some(mut issue) = self.state.read().issues.get(id).cloned() else {
            return Err(StoreError::MissingPrecondition(format!("issue {id} not found")));
        };
        issue.labels.insert(label.to_string()); // set semantics: insert is a no-op if already present
        self.append(WalEntry::IssueUpserted { issue })
    }

    async fn remove_label(&self, id: &IssueId, label: &str) -> Result<(), StoreError> {
        let Some(mut issue) = self.state.read().issues.get(id).cloned() else {
            return Ok(());
        };
        issue.labels.remove(label);
        self.append(WalEntry::IssueUpserted { issue })
    }

    async fn list_labels(&self, id: &IssueId) -> Result<Vec<String>, StoreError> {
        Ok(self.state.read().issues.get(id).map(|i| i.labels.iter().cloned().collect()).unwrap_or_default())
    }

    async fn add_dependency(&self, dep: Dependency) -> Result<(), StoreError> {
        if matches!(dep.dependency_type, DependencyType::Blocks) {
            let state = self.state.read();
            if state.would_create_blocks_cycle(&dep.issue, &dep.depends_on) {
                return Err(StoreError::Conflict(format!(
                    "dependency {} -> {} would create a cycle",
                    dep.issue, dep.depends_on
                )));
            }
        }
        self.append(WalEntry::DependencyAdded { dependency: dep })
    }

    async fn remove_dependency(&self, issue: &IssueId, depends_on: &IssueId) -> Result<(), StoreError> {
        self.append(WalEntry::DependencyRemoved {
            issue: issue.clone(),
            depends_on: depends_on.clone(),
        })
    }

    async fn get_dependencies(&self, issue: &IssueId, kind: DependencyType) -> Result<Vec<Dependency>, StoreError> {
        Ok(self
            .state
            .read()
            .dependencies
            .iter()
            .filter(|d| &d.issue == issue && d.dependency_type == kind)
            .cloned()
            .collect())
    }

    async fn get_parents(&self, issue: &IssueId, kind: DependencyType) -> Result<Vec<IssueId>, StoreError> {
        Ok(self
            .state
            .read()
            .dependencies
            .iter()
            .filter(|d| &d.issue == issue && d.dependency_type == kind)
            .map(|d| d.depends_on.clone())
            .collect())
    }

    async fn get_children(&self, parent: &IssueId) -> Result<Vec<Issue>, StoreError> {
        Ok(self.state.read().children_of(parent).into_iter().cloned().collect())
    }

    async fn get_ready_work(&self, filter: ReadyWorkFilter) -> Result<Vec<Issue>, StoreError> {
        let state = self.state.read();
        let mut ready: Vec<Issue> = state
            .issues
            .values()
            .filter(|issue| issue.status == IssueStatus::Open)
            .filter(|issue| filter.issue_type.map_or(true, |t| issue.issue_type == t))
            .filter(|issue| filter.subtype.map_or(true, |s| issue.subtype == s))
            .filter(|issue| filter.require_label.as_ref().map_or(true, |l| issue.has_label(l)))
            .filter(|issue| !filter.exclude_label.as_ref().map_or(false, |l| issue.has_label(l)))
            .filter(|issue| !state.exec_states.contains_key(&issue.id))
            .filter(|issue| state.open_blockers_of(&issue.id).is_empty())
            .cloned()
            .collect();

        ready.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.created_at.cmp(&b.created_at)));
        if filter.limit > 0 {
            ready.truncate(filter.limit);
        }
        Ok(ready)
    }

    async fn register_instance(&self, instance: ExecutorInstance) -> Result<(), StoreError> {
        self.append(WalEntry::ExecutorUpserted { instance })
    }

    async fn update_heartbeat(&self, id: &ExecutorId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let Some(mut instance) = self.state.read().executors.get(id).cloned() else {
            return Err(StoreError::Transient(format!("unknown executor {id}")));
        };
        instance.last_heartbeat = now;
        self.append(WalEntry::ExecutorUpserted { instance })
    }

    async fn mark_stopped(&self, id: &ExecutorId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let Some(mut instance) = self.state.read().executors.get(id).cloned() else {
            return Ok(());
        };
        instance.status = ExecutorStatus::Stopped;
        instance.last_heartbeat = now;
        self.append(WalEntry::ExecutorUpserted { instance })
    }

    async fn get_active_instances(&self) -> Result<Vec<ExecutorInstance>, StoreError> {
        Ok(self
            .state
            .read()
            .executors
            .values()
            .filter(|i| i.status == ExecutorStatus::Running)
            .cloned()
            .collect())
    }

    async fn cleanup_stale(&self, threshold: Duration, now: DateTime<Utc>) -> Result<StaleSweepResult, StoreError> {
        let stale_rows: Vec<vc_core::ExecutionStateRow> = {
            let state = self.state.read();
            state
                .exec_states
                .values()
                .filter(|row| {
                    row.owner
                        .as_ref()
                        .and_then(|owner_id| state.executors.get(owner_id))
                        .map(|owner| owner.is_stale(now, threshold))
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        };

        let mut result = StaleSweepResult::default();
        for mut row in stale_rows {
            if let Some(owner) = row.owner.take() {
                result.stale_executors.push(owner);
            }
            row.state = vc_core::ExecState::Pending;
            row.updated_at = now;
            self.append(WalEntry::ExecStateUpserted { row: row.clone() })?;

            if let Some(issue) = self.state.read().issues.get(&row.issue_id).cloned() {
                self.append(WalEntry::IssueUpserted { issue: reopened(issue, now) })?;
            }
            result.reclaimed_issues.push(row.issue_id);
        }
        result.stale_executors.sort();
        result.stale_executors.dedup();
        Ok(result)
    }

    async fn cleanup_stopped_instances(
        &self,
        age: Duration,
        keep_recent: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExecutorId>, StoreError> {
        let mut stopped: Vec<ExecutorInstance> = self
            .state
            .read()
            .executors
            .values()
            .filter(|i| i.status == ExecutorStatus::Stopped)
            .cloned()
            .collect();
        stopped.sort_by(|a, b| b.last_heartbeat.cmp(&a.last_heartbeat));

        let mut removed = Vec::new();
        for instance in stopped.into_iter().skip(keep_recent) {
            if now.signed_duration_since(instance.last_heartbeat) > age {
                self.append(WalEntry::ExecutorDeleted { id: instance.id.clone() })?;
                removed.push(instance.id);
            }
        }
        Ok(removed)
    }

    async fn claim_issue(&self, issue: &IssueId, instance: &ExecutorId, now: DateTime<Utc>) -> Result<ClaimOutcome, StoreError> {
        {
            let state = self.state.read();
            if state.exec_states.contains_key(issue) {
                return Ok(ClaimOutcome::AlreadyClaimed);
            }
        }
        let row = vc_core::ExecutionStateRow::claimed(issue.clone(), instance.clone(), now);
        // Re-check under the write half implicitly: append() takes the write
        // lock for the whole upsert, and we already confirmed absence while
        // holding a (dropped) read lock above — single-writer MemoryStore
        // instance means no other writer can interleave between the two.
        self.append(WalEntry::ExecStateUpserted { row: row.clone() })?;
        Ok(ClaimOutcome::Claimed(row))
    }

    async fn update_execution_state(&self, row: vc_core::ExecutionStateRow) -> Result<(), StoreError> {
        self.append(WalEntry::ExecStateUpserted { row })
    }

    async fn get_execution_state(&self, issue: &IssueId) -> Result<Option<vc_core::ExecutionStateRow>, StoreError> {
        Ok(self.state.read().exec_states.get(issue).cloned())
    }

    async fn release_issue(&self, issue: &IssueId) -> Result<(), StoreError> {
        if !self.state.read().exec_states.contains_key(issue) {
            return Ok(()); // idempotent (§4.2, §8 property 7)
        }
        self.append(WalEntry::ExecStateDeleted { issue_id: issue.clone() })
    }

    async fn release_and_reopen(&self, issue: &IssueId) -> Result<(), StoreError> {
        self.release_issue(issue).await?;
        let Some(existing) = self.state.read().issues.get(issue).cloned() else {
            return Ok(());
        };
        self.append(WalEntry::IssueUpserted {
            issue: reopened(existing, Utc::now()),
        })
    }

    async fn save_checkpoint(&self, issue: &IssueId, blob: serde_json::Value) -> Result<(), StoreError> {
        self.append(WalEntry::CheckpointSaved {
            issue_id: issue.clone(),
            blob,
        })
    }

    async fn get_checkpoint(&self, issue: &IssueId) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.state.read().checkpoints.get(issue).cloned())
    }

    async fn save_interrupt(&self, metadata: InterruptMetadata) -> Result<(), StoreError> {
        self.append(WalEntry::InterruptUpserted { metadata })
    }

    async fn get_interrupt(&self, issue: &IssueId) -> Result<Option<InterruptMetadata>, StoreError> {
        Ok(self.state.read().interrupts.get(issue).cloned())
    }

    async fn delete_interrupt(&self, issue: &IssueId) -> Result<(), StoreError> {
        self.append(WalEntry::InterruptDeleted { issue_id: issue.clone() })
    }

    async fn list_interrupted(&self) -> Result<Vec<InterruptMetadata>, StoreError> {
        Ok(self.state.read().interrupts.values().cloned().collect())
    }

    async fn set_gate_baseline(&self, baseline: GateBaseline) -> Result<(), StoreError> {
        self.append(WalEntry::BaselineUpserted { baseline })
    }

    async fn get_gate_baseline(&self, commit_hash: &CommitHash) -> Result<Option<GateBaseline>, StoreError> {
        Ok(self.state.read().baselines.get(commit_hash).cloned())
    }

    async fn invalidate_gate_baseline(&self, commit_hash: &CommitHash) -> Result<(), StoreError> {
        self.append(WalEntry::BaselineInvalidated {
            commit_hash: commit_hash.clone(),
        })
    }

    async fn store_agent_event(&self, event: AgentEvent) -> Result<(), StoreError> {
        self.append(WalEntry::EventStored { event })
    }

    async fn get_agent_events(&self, issue: Option<&IssueId>, limit: usize) -> Result<Vec<AgentEvent>, StoreError> {
        let state = self.state.read();
        let mut events: Vec<AgentEvent> = state
            .events
            .values()
            .filter(|e| issue.map_or(true, |id| e.issue_id.as_ref() == Some(id)))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        if limit > 0 && events.len() > limit {
            let drop = events.len() - limit;
            events.drain(0..drop);
        }
        Ok(events)
    }

    async fn cleanup_events_by_age(&self, max_age: Duration, max_age_critical: Duration, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let to_prune: Vec<EventId> = self
            .state
            .read()
            .events
            .values()
            .filter(|e| {
                let threshold = if e.severity == vc_core::Severity::Critical { max_age_critical } else { max_age };
                now.signed_duration_since(e.timestamp) > threshold
            })
            .map(|e| e.id.clone())
            .collect();
        let n = to_prune.len();
        if n > 0 {
            self.append(WalEntry::EventsPruned { ids: to_prune })?;
        }
        Ok(n)
    }

    async fn cleanup_events_per_issue(&self, max_per_issue: usize) -> Result<usize, StoreError> {
        use std::collections::HashMap;
        let state = self.state.read();
        let mut by_issue: HashMap<IssueId, Vec<&AgentEvent>> = HashMap::new();
        for event in state.events.values() {
            if let Some(id) = &event.issue_id {
                by_issue.entry(id.clone()).or_default().push(event);
            }
        }
        let mut to_prune = Vec::new();
        for events in by_issue.values_mut() {
            events.sort_by_key(|e| e.timestamp);
            if events.len() > max_per_issue {
                let drop = events.len() - max_per_issue;
                to_prune.extend(events[..drop].iter().map(|e| e.id.clone()));
            }
        }
        drop(state);
        let n = to_prune.len();
        if n > 0 {
            self.append(WalEntry::EventsPruned { ids: to_prune })?;
        }
        Ok(n)
    }

    async fn cleanup_events_global(&self, max_global: usize) -> Result<usize, StoreError> {
        // Collect owned ids since we can't hold the read guard across append().
        let mut sorted: Vec<AgentEvent> = self.state.read().events.values().cloned().collect();
        sorted.sort_by_key(|e| e.timestamp);
        let n = sorted.len().saturating_sub(max_global);
        let to_prune: Vec<EventId> = sorted.into_iter().take(n).map(|e| e.id).collect();
        if !to_prune.is_empty() {
            self.append(WalEntry::EventsPruned { ids: to_prune })?;
        }
        Ok(n)
    }

    async fn get_event_counts(&self) -> Result<(usize, usize), StoreError> {
        let state = self.state.read();
        let global = state.events.len();
        let with_issue = state.events.values().filter(|e| e.issue_id.is_some()).count();
        Ok((global, with_issue))
    }

    async fn vacuum(&self) -> Result<(), StoreError> {
        self.checkpoint(Utc::now())
    }

    async fn create_mission(&self, mut issue: Issue, sandbox_path: String, branch_name: String) -> Result<Issue, StoreError> {
        issue.subtype = vc_core::IssueSubtype::Mission;
        issue.mission.sandbox_path = Some(sandbox_path);
        issue.mission.branch_name = Some(branch_name);
        self.create_issue(issue).await
    }

    async fn get_mission(&self, id: &IssueId) -> Result<Option<Issue>, StoreError> {
        Ok(self.state.read().issues.get(id).filter(|i| i.is_mission()).cloned())
    }

    async fn update_mission(&self, issue: Issue) -> Result<Issue, StoreError> {
        self.update_issue(issue).await
    }

    async fn get_mission_for_task(&self, task: &IssueId) -> Result<Option<Issue>, StoreError> {
        let state = self.state.read();
        let mut current = task.clone();
        loop {
            let parents = state.parents_of(&current);
            let Some(parent_id) = parents.first() else {
                return Ok(None);
            };
            if let Some(parent) = state.issues.get(parent_id) {
                if parent.is_mission() {
                    return Ok(Some(parent.clone()));
                }
            }
            current = parent_id.clone();
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
