// SPDX-License-Identifier: MIT

//! Centralized interrupt signaling (§4.2, §9): one [`InterruptManager`]
//! shared by the dispatcher, holding one `AtomicBool` per in-flight issue
//! plus the requested reason/actor, checked at a small number of named
//! checkpoints instead of scattered call sites.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vc_core::{InterruptedBy, IssueId};

/// The requested reason/actor for a pending interrupt, set by `request` and
/// consumed by `take` once the state machine observes and acts on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInterrupt {
    pub interrupted_by: InterruptedBy,
    pub reason: String,
}

#[derive(Default)]
struct Slot {
    flag: AtomicBool,
    pending: RwLock<Option<PendingInterrupt>>,
}

/// One shared instance per executor process. Cheap to clone (wraps an `Arc`).
#[derive(Clone, Default)]
pub struct InterruptManager {
    slots: Arc<RwLock<HashMap<IssueId, Arc<Slot>>>>,
}

impl InterruptManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an issue as in-flight so its interrupt flag can be raised.
    /// Idempotent: calling twice for the same issue is a no-op on the second call.
    pub fn track(&self, issue: &IssueId) {
        self.slots
            .write()
            .entry(issue.clone())
            .or_insert_with(|| Arc::new(Slot::default()));
    }

    /// Stop tracking an issue (attempt completed or released).
    pub fn untrack(&self, issue: &IssueId) {
        self.slots.write().remove(issue);
    }

    /// Request an interrupt for a tracked issue. Returns `false` if the issue
    /// is not currently tracked (not executing) — the control socket maps
    /// this to `"no task currently executing"` / mismatch errors (§6.2).
    pub fn request(&self, issue: &IssueId, interrupted_by: InterruptedBy, reason: impl Into<String>) -> bool {
        let slots = self.slots.read();
        match slots.get(issue) {
            Some(slot) => {
                slot.flag.store(true, Ordering::SeqCst);
                *slot.pending.write() = Some(PendingInterrupt {
                    interrupted_by,
                    reason: reason.into(),
                });
                true
            }
            None => false,
        }
    }

    /// Checkpoint call: is an interrupt pending for this issue? Called at
    /// every state-machine boundary and agent-I/O yield point (§4.2, §9).
    pub fn is_requested(&self, issue: &IssueId) -> bool {
        self.slots
            .read()
            .get(issue)
            .is_some_and(|slot| slot.flag.load(Ordering::SeqCst))
    }

    /// Consume and return the pending interrupt details, clearing the flag.
    pub fn take(&self, issue: &IssueId) -> Option<PendingInterrupt> {
        let slots = self.slots.read();
        let slot = slots.get(issue)?;
        slot.flag.store(false, Ordering::SeqCst);
        slot.pending.write().take()
    }

    pub fn is_tracked(&self, issue: &IssueId) -> bool {
        self.slots.read().contains_key(issue)
    }

    /// The issue ids currently tracked as in-flight, for the control
    /// socket's `status()` and `pause()` validation (§6.2).
    pub fn tracked_issues(&self) -> Vec<IssueId> {
        self.slots.read().keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "interrupt_manager_tests.rs"]
mod tests;
