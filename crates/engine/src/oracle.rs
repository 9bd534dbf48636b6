// SPDX-License-Identifier: MIT

//! AI supervisor port (§4.2, §4.7, §4.8): one trait, several methods,
//! keeping every AI-shaped call behind a single seam rather than one trait
//! per call site.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vc_core::{AgentEvent, Issue};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle request failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreAssessment {
    pub strategy: String,
    pub confidence: f64,
    pub steps: Vec<String>,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAnalysis {
    pub summary: String,
    pub acceptance_criteria_met: bool,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionAssessment {
    pub should_close: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub caveats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopVerdict {
    pub should_halt: bool,
    pub confidence: f64,
    pub loop_type: String,
    pub reasoning: String,
    pub diagnostic_summary: String,
}

/// A single seam for every AI-shaped call the core makes (§4.2 `claimed` and
/// `analyzing` states, §4.7 epic completion, §4.8 loop/anomaly detection).
#[async_trait]
pub trait AiSupervisor: Send + Sync {
    async fn pre_assess(&self, issue: &Issue) -> Result<PreAssessment, OracleError>;
    async fn analyze_execution(
        &self,
        issue: &Issue,
        agent_stdout_sample: &str,
        agent_stderr_sample: &str,
    ) -> Result<ExecutionAnalysis, OracleError>;
    async fn assess_completion(&self, epic: &Issue, children: &[Issue]) -> Result<CompletionAssessment, OracleError>;
    async fn detect_loop(&self, recent_events: &[AgentEvent]) -> Result<LoopVerdict, OracleError>;
}

/// Always reports unavailable. Exercises the deterministic-fallback paths
/// (§4.7 step 4, §7 "AI oracle failure") without needing a real oracle.
#[derive(Debug, Clone, Default)]
pub struct NoopSupervisor;

#[async_trait]
impl AiSupervisor for NoopSupervisor {
    async fn pre_assess(&self, _issue: &Issue) -> Result<PreAssessment, OracleError> {
        Err(OracleError::Unavailable("no oracle configured".into()))
    }

    async fn analyze_execution(
        &self,
        _issue: &Issue,
        _agent_stdout_sample: &str,
        _agent_stderr_sample: &str,
    ) -> Result<ExecutionAnalysis, OracleError> {
        Err(OracleError::Unavailable("no oracle configured".into()))
    }

    async fn assess_completion(&self, _epic: &Issue, _children: &[Issue]) -> Result<CompletionAssessment, OracleError> {
        Err(OracleError::Unavailable("no oracle configured".into()))
    }

    async fn detect_loop(&self, _recent_events: &[AgentEvent]) -> Result<LoopVerdict, OracleError> {
        Err(OracleError::Unavailable("no oracle configured".into()))
    }
}

#[cfg(test)]
#[path = "oracle_tests.rs"]
mod tests;
