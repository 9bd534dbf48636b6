// SPDX-License-Identifier: MIT

//! Per-issue execution state (§3, §4.2).
//!
//! `ExecState` is linear and forward-only within one attempt. `Pending` is
//! a sentinel used only by stale-lease reclamation (§4.1, §9): it means
//! "unclaimed, but a checkpoint may still exist" and is never reached by
//! forward progress from `Claimed`.

use crate::id::{ExecutorId, IssueId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecState {
    /// Stale-reclamation sentinel: owner cleared, checkpoint preserved.
    Pending,
    Claimed,
    Assessing,
    Executing,
    Analyzing,
    Gates,
    Committing,
    Completed,
}

crate::simple_display! {
    ExecState {
        Pending => "pending",
        Claimed => "claimed",
        Assessing => "assessing",
        Executing => "executing",
        Analyzing => "analyzing",
        Gates => "gates",
        Committing => "committing",
        Completed => "completed",
    }
}

impl ExecState {
    /// The fixed forward sequence an attempt traverses from `Claimed`.
    pub const SEQUENCE: [ExecState; 7] = [
        ExecState::Claimed,
        ExecState::Assessing,
        ExecState::Executing,
        ExecState::Analyzing,
        ExecState::Gates,
        ExecState::Committing,
        ExecState::Completed,
    ];

    /// The next state in the linear sequence, or `None` if terminal or `Pending`.
    pub fn next(self) -> Option<ExecState> {
        let idx = Self::SEQUENCE.iter().position(|s| *s == self)?;
        Self::SEQUENCE.get(idx + 1).copied()
    }

    /// Whether `other` is a legal successor of `self` (used by invariant tests).
    pub fn can_advance_to(self, other: ExecState) -> bool {
        self.next() == Some(other)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecState::Completed)
    }
}

/// Per-issue, transient execution-state row (§3). Deleted on explicit
/// release after a completed attempt; preserved (owner cleared, state
/// reset to `Pending`) by stale-lease reclamation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStateRow {
    pub issue_id: IssueId,
    pub state: ExecState,
    pub owner: Option<ExecutorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Opaque per-issue resume blob, written during execution.
    pub checkpoint: Option<serde_json::Value>,
}

impl ExecutionStateRow {
    pub fn claimed(issue_id: IssueId, owner: ExecutorId, now: DateTime<Utc>) -> Self {
        Self {
            issue_id,
            state: ExecState::Claimed,
            owner: Some(owner),
            created_at: now,
            updated_at: now,
            checkpoint: None,
        }
    }
}

#[cfg(test)]
#[path = "exec_state_tests.rs"]
mod tests;
