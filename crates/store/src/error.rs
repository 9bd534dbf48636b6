// SPDX-License-Identifier: MIT

//! Error taxonomy for the tracker store (§7).

use thiserror::Error;

/// Errors a [`crate::TrackerStore`] implementation can surface. Mirrors the
/// three store-facing kinds from the distilled spec's error taxonomy (§7):
/// transient failures, conflicts, and missing-precondition cases. Both
/// `Conflict` and `MissingPrecondition` are treated as success-noop by
/// callers (idempotency requirement, §4.1/§4.2/§8 property 7) — they are
/// still distinct error variants so a caller *can* distinguish if it needs
/// to, but the common path is to match and swallow them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transient store error: {0}")]
    Transient(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("missing precondition: {0}")]
    MissingPrecondition(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this error is one the caller should treat as a success-noop
    /// per the idempotency contracts in §4/§7/§8.
    pub fn is_idempotent_noop(&self) -> bool {
        matches!(self, StoreError::Conflict(_) | StoreError::MissingPrecondition(_))
    }
}
