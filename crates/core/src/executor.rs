// SPDX-License-Identifier: MIT

//! Executor instance: a running process incarnation (§3).

use crate::id::ExecutorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorStatus {
    Running,
    Stopped,
}

crate::simple_display! {
    ExecutorStatus {
        Running => "running",
        Stopped => "stopped",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorInstance {
    pub id: ExecutorId,
    pub hostname: String,
    pub pid: u32,
    pub status: ExecutorStatus,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub version: String,
    pub metadata: HashMap<String, String>,
}

impl ExecutorInstance {
    pub fn new(id: ExecutorId, hostname: String, pid: u32, version: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            hostname,
            pid,
            status: ExecutorStatus::Running,
            started_at: now,
            last_heartbeat: now,
            version,
            metadata: HashMap::new(),
        }
    }

    /// Whether this instance is stale relative to `now`, given `threshold`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_heartbeat) > threshold
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
