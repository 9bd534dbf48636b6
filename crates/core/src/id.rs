// SPDX-License-Identifier: MIT

//! Identifiers used throughout the core.

crate::define_id! {
    /// Stable identifier for an [`Issue`](crate::issue::Issue). Immutable once assigned.
    pub struct IssueId;
}

crate::define_id! {
    /// Identifier for a running executor process incarnation.
    pub struct ExecutorId;
}

crate::define_id! {
    /// Identifier for a structured [`AgentEvent`](crate::event::AgentEvent).
    pub struct EventId;
}

crate::define_id! {
    /// Identifier for an in-flight coding-agent subprocess.
    pub struct AgentProcId;
}

/// Generates identifiers. Abstracted so tests can use deterministic,
/// sequential ids instead of random UUIDs.
pub trait IdGen: Send + Sync {
    fn issue_id(&self) -> crate::id::IssueId;
    fn executor_id(&self) -> crate::id::ExecutorId;
    fn event_id(&self) -> crate::id::EventId;
    fn agent_proc_id(&self) -> crate::id::AgentProcId;
}

/// Default id generator backed by uuid v4.
#[derive(Debug, Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn issue_id(&self) -> IssueId {
        IssueId::new()
    }

    fn executor_id(&self) -> ExecutorId {
        ExecutorId::new()
    }

    fn event_id(&self) -> EventId {
        EventId::new()
    }

    fn agent_proc_id(&self) -> AgentProcId {
        AgentProcId::new()
    }
}

/// Deterministic id generator for tests: `prefix-N` for each kind, counted independently.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct SequentialIdGen {
    issue: std::sync::atomic::AtomicU64,
    executor: std::sync::atomic::AtomicU64,
    event: std::sync::atomic::AtomicU64,
    agent: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "test-support"))]
impl IdGen for SequentialIdGen {
    fn issue_id(&self) -> IssueId {
        let n = self.issue.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        IssueId::from_str_id(format!("issue-{n}"))
    }

    fn executor_id(&self) -> ExecutorId {
        let n = self.executor.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        ExecutorId::from_str_id(format!("executor-{n}"))
    }

    fn event_id(&self) -> EventId {
        let n = self.event.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        EventId::from_str_id(format!("event-{n}"))
    }

    fn agent_proc_id(&self) -> AgentProcId {
        let n = self.agent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        AgentProcId::from_str_id(format!("agent-{n}"))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
