// SPDX-License-Identifier: MIT

//! In-memory materialized state backing [`crate::MemoryStore`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vc_core::{
    AgentEvent, CommitHash, Dependency, EventId, ExecutorId, ExecutorInstance, GateBaseline,
    InterruptMetadata, Issue, IssueId,
};

/// The complete, serializable state of the tracker as the core sees it:
/// one struct a snapshot can serialize wholesale and a WAL can replay
/// operations against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub issues: BTreeMap<IssueId, Issue>,
    pub dependencies: Vec<Dependency>,
    pub exec_states: BTreeMap<IssueId, vc_core::ExecutionStateRow>,
    pub checkpoints: BTreeMap<IssueId, serde_json::Value>,
    pub executors: BTreeMap<ExecutorId, ExecutorInstance>,
    pub interrupts: BTreeMap<IssueId, InterruptMetadata>,
    pub baselines: BTreeMap<CommitHash, GateBaseline>,
    pub events: BTreeMap<EventId, AgentEvent>,
}

impl MaterializedState {
    pub fn children_of(&self, parent: &IssueId) -> Vec<&Issue> {
        self.dependencies
            .iter()
            .filter(|d| {
                matches!(d.dependency_type, vc_core::DependencyType::ParentChild) && d.depends_on == *parent
            })
            .filter_map(|d| self.issues.get(&d.issue))
            .collect()
    }

    pub fn parents_of(&self, child: &IssueId) -> Vec<IssueId> {
        self.dependencies
            .iter()
            .filter(|d| matches!(d.dependency_type, vc_core::DependencyType::ParentChild) && d.issue == *child)
            .map(|d| d.depends_on.clone())
            .collect()
    }

    /// Open `blocks` predecessors of `issue` (§4.1 `next_ready` filter).
    pub fn open_blockers_of(&self, issue: &IssueId) -> Vec<IssueId> {
        self.dependencies
            .iter()
            .filter(|d| matches!(d.dependency_type, vc_core::DependencyType::Blocks) && d.issue == *issue)
            .filter(|d| {
                self.issues
                    .get(&d.depends_on)
                    .map(|i| i.status != vc_core::IssueStatus::Closed)
                    .unwrap_or(false)
            })
            .map(|d| d.depends_on.clone())
            .collect()
    }

    /// Detect whether adding `issue -> depends_on` (a `blocks` edge) would
    /// create a cycle (§3).
    pub fn would_create_blocks_cycle(&self, issue: &IssueId, depends_on: &IssueId) -> bool {
        if issue == depends_on {
            return true;
        }
        let mut stack = vec![depends_on.clone()];
        let mut seen = std::collections::BTreeSet::new();
        while let Some(node) = stack.pop() {
            if &node == issue {
                return true;
            }
            if !seen.insert(node.clone()) {
                continue;
            }
            for dep in self.dependencies.iter().filter(|d| {
                matches!(d.dependency_type, vc_core::DependencyType::Blocks) && d.issue == node
            }) {
                stack.push(dep.depends_on.clone());
            }
        }
        false
    }
}
