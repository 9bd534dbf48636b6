// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! vc-core: domain types for the autonomous issue-executor core.
//!
//! Everything here is a plain, serde-friendly value type with no I/O. Ports
//! (the store, the agent adapters, the AI oracle) live in downstream crates
//! and are expressed in terms of these types.

#[macro_use]
pub mod macros;

pub mod clock;
pub mod event;
pub mod exec_state;
pub mod executor;
pub mod gate_baseline;
pub mod id;
pub mod interrupt;
pub mod issue;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{AgentEvent, AgentEventKind, CacheType, RetentionPolicy, RollbackStage, Severity};
pub use exec_state::{ExecState, ExecutionStateRow};
pub use executor::{ExecutorInstance, ExecutorStatus};
pub use gate_baseline::{CommitHash, GateBaseline, GateResult};
pub use id::{AgentProcId, EventId, ExecutorId, IdGen, IssueId, UuidIdGen};
#[cfg(any(test, feature = "test-support"))]
pub use id::SequentialIdGen;
pub use interrupt::{ContextSnapshot, InterruptMetadata, InterruptedBy};
pub use issue::{Dependency, DependencyType, Issue, IssueStatus, IssueSubtype, IssueType, MissionFields};
