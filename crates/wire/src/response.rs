// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use vc_core::{ExecState, ExecutorId, InterruptedBy, IssueId};

/// Summary of one issue's pending interrupt metadata, for `list_interrupted`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterruptedSummary {
    pub issue_id: IssueId,
    pub interrupted_at: DateTime<Utc>,
    pub interrupted_by: InterruptedBy,
    pub reason: String,
    pub execution_state_at_interruption: ExecState,
    pub resume_count: u32,
}

/// Response from daemon to control-socket client (§6.2).
///
/// Every variant but one shares the uniform `{"type": "<Variant>", ...}`
/// wire shape used throughout this crate. `InterruptRequested` is the lone
/// exception: §6.2 mandates `{"status": "interrupt_requested", ...}` for a
/// successful pause, so this enum carries its own `Serialize`/`Deserialize`
/// instead of the usual `#[serde(tag = "type")]` derive.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlResponse {
    /// `status()` reply.
    Status {
        executor_id: ExecutorId,
        hostname: String,
        pid: u32,
        version: String,
        uptime_secs: u64,
        current_issue: Option<IssueId>,
    },
    /// Successful `pause`: `{status: "interrupt_requested", issue_id, reason}`.
    InterruptRequested { issue_id: IssueId, reason: String },
    /// Successful `resume`.
    Resumed { issue_id: IssueId },
    /// `list_interrupted()` reply.
    Interrupted { issues: Vec<InterruptedSummary> },
    /// A request failed validation (e.g. pause against a non-running issue).
    Error { message: String },
}

impl ControlResponse {
    pub fn no_task_currently_executing() -> Self {
        ControlResponse::Error {
            message: "no task currently executing".to_string(),
        }
    }

    pub fn issue_not_currently_executing(requested: &IssueId, current: &IssueId) -> Self {
        ControlResponse::Error {
            message: format!("issue {requested} is not currently executing (current: {current})"),
        }
    }
}

impl Serialize for ControlResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = match self {
            ControlResponse::Status {
                executor_id,
                hostname,
                pid,
                version,
                uptime_secs,
                current_issue,
            } => serde_json::json!({
                "type": "Status",
                "executor_id": executor_id,
                "hostname": hostname,
                "pid": pid,
                "version": version,
                "uptime_secs": uptime_secs,
                "current_issue": current_issue,
            }),
            ControlResponse::InterruptRequested { issue_id, reason } => serde_json::json!({
                "status": "interrupt_requested",
                "issue_id": issue_id,
                "reason": reason,
            }),
            ControlResponse::Resumed { issue_id } => serde_json::json!({
                "type": "Resumed",
                "issue_id": issue_id,
            }),
            ControlResponse::Interrupted { issues } => serde_json::json!({
                "type": "Interrupted",
                "issues": issues,
            }),
            ControlResponse::Error { message } => serde_json::json!({
                "type": "Error",
                "message": message,
            }),
        };
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ControlResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        if let Some(status) = value.get("status").and_then(serde_json::Value::as_str) {
            return match status {
                "interrupt_requested" => Ok(ControlResponse::InterruptRequested {
                    issue_id: field(&value, "issue_id").map_err(serde::de::Error::custom)?,
                    reason: field(&value, "reason").map_err(serde::de::Error::custom)?,
                }),
                other => Err(serde::de::Error::custom(format!("unknown response status `{other}`"))),
            };
        }

        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| serde::de::Error::custom("response is missing a `type` or `status` tag"))?;

        match tag {
            "Status" => Ok(ControlResponse::Status {
                executor_id: field(&value, "executor_id").map_err(serde::de::Error::custom)?,
                hostname: field(&value, "hostname").map_err(serde::de::Error::custom)?,
                pid: field(&value, "pid").map_err(serde::de::Error::custom)?,
                version: field(&value, "version").map_err(serde::de::Error::custom)?,
                uptime_secs: field(&value, "uptime_secs").map_err(serde::de::Error::custom)?,
                current_issue: field(&value, "current_issue").map_err(serde::de::Error::custom)?,
            }),
            "Resumed" => Ok(ControlResponse::Resumed {
                issue_id: field(&value, "issue_id").map_err(serde::de::Error::custom)?,
            }),
            "Interrupted" => Ok(ControlResponse::Interrupted {
                issues: field(&value, "issues").map_err(serde::de::Error::custom)?,
            }),
            "Error" => Ok(ControlResponse::Error {
                message: field(&value, "message").map_err(serde::de::Error::custom)?,
            }),
            other => Err(serde::de::Error::custom(format!("unknown response type `{other}`"))),
        }
    }
}

/// Pull `name` out of a JSON object, defaulting to `null` when absent so a
/// missing optional field still deserializes instead of erroring.
fn field<T: serde::de::DeserializeOwned>(value: &serde_json::Value, name: &str) -> Result<T, String> {
    let raw = value.get(name).cloned().unwrap_or(serde_json::Value::Null);
    serde_json::from_value(raw).map_err(|e| format!("field `{name}`: {e}"))
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
