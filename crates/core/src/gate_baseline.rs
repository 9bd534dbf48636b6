// SPDX-License-Identifier: MIT

//! Gate baseline: commit-hash-keyed cache of a quality-gate run (§3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

crate::define_id! {
    /// A resolved working-tree commit hash, used as the baseline cache key.
    pub struct CommitHash;
}

/// Result of a single gate run, as produced by a `GateProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_name: String,
    pub passed: bool,
    pub output: String,
    pub error: Option<String>,
}

/// Cached baseline gate result for one commit (§3, §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateBaseline {
    pub commit_hash: CommitHash,
    pub branch_name: String,
    pub timestamp: DateTime<Utc>,
    pub all_passed: bool,
    pub results: BTreeMap<String, GateResult>,
}

impl GateBaseline {
    pub fn new(
        commit_hash: CommitHash,
        branch_name: impl Into<String>,
        results: Vec<GateResult>,
        now: DateTime<Utc>,
    ) -> Self {
        let all_passed = results.iter().all(|r| r.passed);
        let results = results.into_iter().map(|r| (r.gate_name.clone(), r)).collect();
        Self {
            commit_hash,
            branch_name: branch_name.into(),
            timestamp: now,
            all_passed,
            results,
        }
    }

    /// Whether this entry is still valid given `ttl` (§4.5 step 2/3).
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.timestamp) <= ttl
    }

    pub fn failing_gates(&self) -> Vec<&GateResult> {
        self.results.values().filter(|r| !r.passed).collect()
    }
}

#[cfg(test)]
#[path = "gate_baseline_tests.rs"]
mod tests;
