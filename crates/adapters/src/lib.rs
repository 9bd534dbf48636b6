// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! vc-adapters: subprocess-facing ports — the coding-agent supervisor,
//! the quality-gate provider, and the version-control adapter (§4.3, §4.4,
//! §4.5, §6).

pub mod agent;
pub mod gate;
pub mod subprocess;
pub mod vcs;

pub use agent::{AgentAdapter, AgentAdapterError, AgentResult, AgentSpawnRequest, AmpAdapter, ClaudeCodeAdapter};
pub use gate::{GateError, GateProvider, GateSpec, ShellGateProvider};
#[cfg(any(test, feature = "test-support"))]
pub use gate::FakeGateProvider;
pub use vcs::{GitVcs, VcsError, VersionControl};
