// SPDX-License-Identifier: MIT

//! Write-ahead log: one serde_json line per mutating operation, opened by
//! path plus a starting sequence number, appended with an fsync per entry.

use crate::state::MaterializedState;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vc_core::{
    AgentEvent, CommitHash, Dependency, ExecutorInstance, GateBaseline, InterruptMetadata, Issue,
    IssueId,
};

#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One durable operation. Applying every `WalEntry` in order to an empty
/// [`MaterializedState`] (or to a loaded snapshot, for entries after its
/// sequence number) reconstructs the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum WalEntry {
    IssueUpserted { issue: Issue },
    DependencyAdded { dependency: Dependency },
    DependencyRemoved { issue: IssueId, depends_on: IssueId },
    ExecStateUpserted { row: vc_core::ExecutionStateRow },
    ExecStateDeleted { issue_id: IssueId },
    CheckpointSaved { issue_id: IssueId, blob: serde_json::Value },
    ExecutorUpserted { instance: ExecutorInstance },
    ExecutorDeleted { id: vc_core::ExecutorId },
    InterruptUpserted { metadata: InterruptMetadata },
    InterruptDeleted { issue_id: IssueId },
    BaselineUpserted { baseline: GateBaseline },
    BaselineInvalidated { commit_hash: CommitHash },
    EventStored { event: AgentEvent },
    EventsPruned { ids: Vec<vc_core::EventId> },
}

impl WalEntry {
    /// Fold this entry into `state` in place.
    pub fn apply(self, state: &mut MaterializedState) {
        match self {
            WalEntry::IssueUpserted { issue } => {
                state.issues.insert(issue.id.clone(), issue);
            }
            WalEntry::DependencyAdded { dependency } => {
                if !state.dependencies.contains(&dependency) {
                    state.dependencies.push(dependency);
                }
            }
            WalEntry::DependencyRemoved { issue, depends_on } => {
                state.dependencies.retain(|d| !(d.issue == issue && d.depends_on == depends_on));
            }
            WalEntry::ExecStateUpserted { row } => {
                state.exec_states.insert(row.issue_id.clone(), row);
            }
            WalEntry::ExecStateDeleted { issue_id } => {
                state.exec_states.remove(&issue_id);
            }
            WalEntry::CheckpointSaved { issue_id, blob } => {
                state.checkpoints.insert(issue_id, blob);
            }
            WalEntry::ExecutorUpserted { instance } => {
                state.executors.insert(instance.id.clone(), instance);
            }
            WalEntry::ExecutorDeleted { id } => {
                state.executors.remove(&id);
            }
            WalEntry::InterruptUpserted { metadata } => {
                state.interrupts.insert(metadata.issue_id.clone(), metadata);
            }
            WalEntry::InterruptDeleted { issue_id } => {
                state.interrupts.remove(&issue_id);
            }
            WalEntry::BaselineUpserted { baseline } => {
                state.baselines.insert(baseline.commit_hash.clone(), baseline);
            }
            WalEntry::BaselineInvalidated { commit_hash } => {
                state.baselines.remove(&commit_hash);
            }
            WalEntry::EventStored { event } => {
                state.events.insert(event.id.clone(), event);
            }
            WalEntry::EventsPruned { ids } => {
                for id in ids {
                    state.events.remove(&id);
                }
            }
        }
    }
}

/// Append-only log of [`WalEntry`] records, one JSON object per line.
pub struct Wal {
    path: PathBuf,
    file: File,
    /// Number of entries written since the log was opened (for the next
    /// sequence number a snapshot would be keyed on).
    seq: u64,
}

impl Wal {
    /// Open (creating if absent) the log at `path`, skipping the first
    /// `skip` lines (already folded into a loaded snapshot) and returning
    /// the remaining entries to replay.
    pub fn open(path: &Path, skip: u64) -> Result<(Self, Vec<WalEntry>), WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut entries = Vec::new();
        let mut seq = 0u64;
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                seq += 1;
                if seq <= skip {
                    continue;
                }
                entries.push(serde_json::from_str(&line)?);
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                seq,
            },
            entries,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Append one entry, fsync'd before returning (durability: a crash right
    /// after `append` returns must not lose the operation).
    pub fn append(&mut self, entry: &WalEntry) -> Result<(), WalError> {
        let line = serde_json::to_string(entry)?;
        writeln!(self.file, "{line}")?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.seq += 1;
        Ok(())
    }

    /// Truncate the log to empty after a snapshot has captured all entries
    /// up to `seq`. Used by the checkpointer to keep the WAL small.
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.file = OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)?;
        self.seq = 0;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
