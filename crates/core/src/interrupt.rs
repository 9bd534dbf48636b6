// SPDX-License-Identifier: MIT

//! Interrupt metadata: persisted pause/resume record (§3, §4.2).

use crate::exec_state::ExecState;
use crate::id::IssueId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who requested the interrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterruptedBy {
    User,
    BudgetMonitor,
    ControlCli,
    Watchdog,
}

crate::simple_display! {
    InterruptedBy {
        User => "user",
        BudgetMonitor => "budget-monitor",
        ControlCli => "control-cli",
        Watchdog => "watchdog",
    }
}

/// Agent-supplied working notes captured at the moment of interruption.
/// Opaque to the core beyond round-tripping; the agent adapter populates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub todos: Vec<String>,
    pub observations: Vec<String>,
    pub last_tool: Option<String>,
    pub progress_summary: Option<String>,
    pub session_duration_secs: u64,
}

/// Persisted pause record for one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptMetadata {
    pub issue_id: IssueId,
    pub interrupted_at: DateTime<Utc>,
    pub interrupted_by: InterruptedBy,
    pub reason: String,
    pub execution_state_at_interruption: ExecState,
    pub context_snapshot: ContextSnapshot,
    pub resume_count: u32,
    pub resumed_at: Option<DateTime<Utc>>,
}

impl InterruptMetadata {
    pub fn new(
        issue_id: IssueId,
        interrupted_by: InterruptedBy,
        reason: impl Into<String>,
        execution_state_at_interruption: ExecState,
        context_snapshot: ContextSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            issue_id,
            interrupted_at: now,
            interrupted_by,
            reason: reason.into(),
            execution_state_at_interruption,
            context_snapshot,
            resume_count: 0,
            resumed_at: None,
        }
    }

    /// Bump `resume_count` and stamp `resumed_at`. Does not clear the
    /// snapshot — metadata is retained as history until explicit discard.
    pub fn mark_resumed(&mut self, now: DateTime<Utc>) {
        self.resume_count += 1;
        self.resumed_at = Some(now);
    }

    /// A resume-context string synthesized for the agent's next prompt.
    pub fn resume_context(&self) -> String {
        let mut out = format!(
            "Resuming after interruption by {} ({}): {}\n",
            self.interrupted_by, self.interrupted_at, self.reason
        );
        if let Some(summary) = &self.context_snapshot.progress_summary {
            out.push_str(&format!("Progress so far: {summary}\n"));
        }
        if !self.context_snapshot.todos.is_empty() {
            out.push_str("Outstanding todos:\n");
            for todo in &self.context_snapshot.todos {
                out.push_str(&format!("- {todo}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "interrupt_tests.rs"]
mod tests;
