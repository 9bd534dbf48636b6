// SPDX-License-Identifier: MIT

//! Agent supervisor: materializes a coding-agent subprocess per §4.3.
//!
//! Two named variants with fixed argv shapes. Both unconditionally include
//! their permission-bypass flag — autonomous operation is a hard requirement
//! regardless of whether the working directory is a sandbox.

use crate::subprocess::{run_with_timeout, sample, SubprocessError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum AgentAdapterError {
    #[error("failed to spawn agent subprocess: {0}")]
    Spawn(String),
    #[error("agent subprocess timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error communicating with agent subprocess: {0}")]
    Io(String),
}

impl From<SubprocessError> for AgentAdapterError {
    fn from(e: SubprocessError) -> Self {
        match e {
            SubprocessError::Spawn(io) => AgentAdapterError::Io(io.to_string()),
            SubprocessError::Timeout { timeout, .. } => AgentAdapterError::Timeout(timeout),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentSpawnRequest {
    pub prompt: String,
    pub working_dir: PathBuf,
    pub streaming_json: bool,
}

/// Structured result of waiting on a coding-agent subprocess (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResult {
    pub exit_code: Option<i32>,
    pub stdout_sample: String,
    pub stderr_sample: String,
    pub completed_at: DateTime<Utc>,
}

const SAMPLE_LEN: usize = 200;

/// One named coding-agent variant (§4.3).
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Human-readable variant name, e.g. `"claude-code"` or `"amp"`.
    fn name(&self) -> &'static str;

    /// Build the exact argv for this variant (excluding the binary itself).
    fn build_args(&self, prompt: &str, streaming_json: bool) -> Vec<String>;

    /// Spawn, stream, wait, and enforce `timeout`, returning a structured
    /// result. Any I/O error surfaces as [`AgentAdapterError`], never a panic.
    async fn run(&self, binary: &str, req: AgentSpawnRequest, timeout: Duration) -> Result<AgentResult, AgentAdapterError> {
        let args = self.build_args(&req.prompt, req.streaming_json);
        let mut cmd = Command::new(binary);
        cmd.args(&args).current_dir(&req.working_dir);

        let output = run_with_timeout(cmd, timeout, self.name()).await?;
        Ok(AgentResult {
            exit_code: output.status.code(),
            stdout_sample: sample(&output.stdout, SAMPLE_LEN),
            stderr_sample: sample(&output.stderr, SAMPLE_LEN),
            completed_at: Utc::now(),
        })
    }
}

/// Variant A: `claude-code`.
#[derive(Debug, Clone, Default)]
pub struct ClaudeCodeAdapter;

impl AgentAdapter for ClaudeCodeAdapter {
    fn name(&self) -> &'static str {
        "claude-code"
    }

    fn build_args(&self, prompt: &str, streaming_json: bool) -> Vec<String> {
        if streaming_json {
            vec![
                "--print".into(),
                "--dangerously-skip-permissions".into(),
                "--verbose".into(),
                "--output-format".into(),
                "stream-json".into(),
                prompt.into(),
            ]
        } else {
            vec!["--print".into(), "--dangerously-skip-permissions".into(), prompt.into()]
        }
    }
}

/// Variant B: `amp`.
#[derive(Debug, Clone, Default)]
pub struct AmpAdapter;

impl AgentAdapter for AmpAdapter {
    fn name(&self) -> &'static str {
        "amp"
    }

    fn build_args(&self, prompt: &str, streaming_json: bool) -> Vec<String> {
        let mut args = vec!["--dangerously-allow-all".to_string(), "--execute".to_string(), prompt.into()];
        if streaming_json {
            args.push("--stream-json".into());
        }
        args
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
