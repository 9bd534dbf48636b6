// SPDX-License-Identifier: MIT

//! Agent event: structured observability log record (§3).
//!
//! Events are for observability, not control flow (§3). `AgentEventKind` is
//! a tagged-variant type per §9's redesign note — a typed payload per kind,
//! with a generic `data` map reserved on [`AgentEvent`] for forwards-compatible
//! fields the core doesn't otherwise know about.

use crate::id::{AgentProcId, EventId, ExecutorId, IssueId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

crate::simple_display! {
    Severity {
        Info => "info",
        Warning => "warning",
        Critical => "critical",
    }
}

/// The well-known event kinds emitted by the core (§4.5, §4.7, §4.4). Unknown
/// kinds produced by future variants round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AgentEventKind {
    #[serde(rename = "pre_flight_check_started")]
    PreFlightCheckStarted,
    #[serde(rename = "baseline_cache_hit")]
    BaselineCacheHit { cache_type: CacheType, age_secs: i64 },
    #[serde(rename = "baseline_cache_miss")]
    BaselineCacheMiss,
    #[serde(rename = "pre_flight_check_completed")]
    PreFlightCheckCompleted {
        duration_ms: u64,
        failing_gates: Vec<String>,
    },
    #[serde(rename = "executor_degraded_mode")]
    ExecutorDegradedMode { failing_gates: Vec<String> },
    #[serde(rename = "quality_gates_rollback")]
    QualityGatesRollback { stage: RollbackStage, reset_ok: bool },
    #[serde(rename = "epic_completed")]
    EpicCompleted { epic_id: IssueId, fallback: bool },
    #[serde(rename = "epic_cleanup_started")]
    EpicCleanupStarted { mission_id: IssueId },
    #[serde(rename = "epic_cleanup_completed")]
    EpicCleanupCompleted { mission_id: IssueId, error: Option<String> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    Memory,
    Database,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStage {
    Started,
    LogPreserved,
    ResetSuccess,
    ResetFailure,
}

/// A structured log record for observability (§3). Retention is bounded by
/// three limits applied in order: age, per-issue count, global count (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: EventId,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub issue_id: Option<IssueId>,
    pub executor_id: Option<ExecutorId>,
    pub agent_id: Option<AgentProcId>,
    pub message: String,
    pub kind: AgentEventKind,
    /// Reserved for unknown forwards-compatible fields; the typed `kind`
    /// payload is the source of truth for known event types.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl AgentEvent {
    pub fn new(id: EventId, kind: AgentEventKind, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            severity: Severity::Info,
            timestamp: now,
            issue_id: None,
            executor_id: None,
            agent_id: None,
            message: message.into(),
            kind,
            data: HashMap::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_issue(mut self, issue_id: IssueId) -> Self {
        self.issue_id = Some(issue_id);
        self
    }

    pub fn with_executor(mut self, executor_id: ExecutorId) -> Self {
        self.executor_id = Some(executor_id);
        self
    }
}

/// Bounded-retention policy (§3): age (with an elevated threshold for
/// `critical` severity), then per-issue count, then global count.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub max_age: chrono::Duration,
    pub max_age_critical: chrono::Duration,
    pub max_per_issue: usize,
    pub max_global: usize,
}

impl RetentionPolicy {
    /// Apply the three limits in order, returning the events that survive.
    /// Input is assumed newest-last; ties within a limit keep the newest.
    pub fn apply(&self, now: DateTime<Utc>, events: Vec<AgentEvent>) -> Vec<AgentEvent> {
        let by_age: Vec<AgentEvent> = events
            .into_iter()
            .filter(|e| {
                let threshold = if e.severity == Severity::Critical {
                    self.max_age_critical
                } else {
                    self.max_age
                };
                now.signed_duration_since(e.timestamp) <= threshold
            })
            .collect();

        let mut per_issue_counts: HashMap<Option<IssueId>, usize> = HashMap::new();
        let mut by_issue_count = Vec::with_capacity(by_age.len());
        for event in by_age.into_iter().rev() {
            let count = per_issue_counts.entry(event.issue_id.clone()).or_insert(0);
            if event.issue_id.is_none() || *count < self.max_per_issue {
                *count += 1;
                by_issue_count.push(event);
            }
        }
        by_issue_count.reverse();

        if by_issue_count.len() > self.max_global {
            let drop = by_issue_count.len() - self.max_global;
            by_issue_count.drain(0..drop);
        }
        by_issue_count
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
