// SPDX-License-Identifier: MIT

//! Issue: the unit of work (§3).

use crate::id::IssueId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Status of an issue. Transitions are monotonic within a single execution
/// attempt (§4.2): an attempt only ever moves `open -> in_progress -> {open,
/// blocked, closed}`, never skipping the dispatcher's claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
}

crate::simple_display! {
    IssueStatus {
        Open => "open",
        InProgress => "in_progress",
        Blocked => "blocked",
        Closed => "closed",
    }
}

/// Coarse type of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Task,
    Epic,
    Bug,
}

crate::simple_display! {
    IssueType {
        Task => "task",
        Epic => "epic",
        Bug => "bug",
    }
}

/// Refinement of [`IssueType`]. Notably `Mission` and `Phase` on epics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSubtype {
    None,
    Mission,
    Phase,
}

/// Additional fields present only on epics with subtype `mission` (§3, §4.7).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionFields {
    pub sandbox_path: Option<String>,
    pub branch_name: Option<String>,
}

/// A unit of work in the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    /// 0 is highest priority.
    pub priority: i32,
    pub issue_type: IssueType,
    pub subtype: IssueSubtype,
    pub acceptance_criteria: Vec<String>,
    pub labels: BTreeSet<String>,
    pub comments: Vec<String>,
    pub mission: MissionFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn new(id: IssueId, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: IssueStatus::Open,
            priority: 5,
            issue_type: IssueType::Task,
            subtype: IssueSubtype::None,
            acceptance_criteria: Vec::new(),
            labels: BTreeSet::new(),
            comments: Vec::new(),
            mission: MissionFields::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_mission(&self) -> bool {
        matches!(self.subtype, IssueSubtype::Mission)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// Directed edge `issue -> depends_on` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    /// Hierarchical: `depends_on` is the parent.
    ParentChild,
    /// Scheduling: `issue` cannot start while `depends_on` is open.
    Blocks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub issue: IssueId,
    pub depends_on: IssueId,
    pub dependency_type: DependencyType,
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
