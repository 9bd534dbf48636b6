// SPDX-License-Identifier: MIT

//! Engine-level error taxonomy (§7): gate failures, oracle failures, and
//! store errors all fold into one `RuntimeError`, matched by worker loops to
//! decide log-and-continue vs. release-with-error — never a crash.

use crate::oracle::OracleError;
use thiserror::Error;
use vc_adapters::{AgentAdapterError, GateError, VcsError};
use vc_store::StoreError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("gate error: {0}")]
    Gate(#[from] GateError),
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("agent error: {0}")]
    Agent(#[from] AgentAdapterError),
    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),
}

impl RuntimeError {
    /// Whether this error should be swallowed as a success-noop, per the
    /// idempotency contracts threaded through from [`StoreError`] (§7, §8).
    pub fn is_idempotent_noop(&self) -> bool {
        matches!(self, RuntimeError::Store(e) if e.is_idempotent_noop())
    }
}
