// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! vc-store: the opaque transactional tracker port (§6) and its default
//! WAL-backed in-memory implementation.

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod state;
pub mod traits;
pub mod wal;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::MaterializedState;
pub use traits::{ClaimOutcome, ReadyWorkFilter, StaleSweepResult, TrackerStore};
pub use wal::{Wal, WalEntry, WalError};
