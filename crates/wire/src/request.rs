// SPDX-License-Identifier: MIT

//! Requests the control socket accepts (§6.2).

use serde::{Deserialize, Serialize};
use vc_core::IssueId;

/// A request frame sent by `vc-cli` (or any control-socket client) to the
/// running daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ControlRequest {
    /// Report what this executor instance is doing right now.
    Status,
    /// Request an interrupt of the currently-executing issue. Fails unless
    /// `issue_id` matches what is actually in flight.
    Pause { issue_id: IssueId, reason: String },
    /// Clear the `interrupted` label and prime resume context for a later
    /// claim of this issue. Does not itself re-claim or re-execute it.
    Resume { issue_id: IssueId },
    /// List every issue currently carrying unresumed interrupt metadata.
    ListInterrupted,
}
