// SPDX-License-Identifier: MIT

//! Loop detector and watchdog (§4.8): two independent anomaly loops sharing
//! the same shape — sample recent events, ask the oracle to judge them,
//! act once confidence clears a threshold.

use crate::events::EventRecorder;
use crate::oracle::{AiSupervisor, LoopVerdict, OracleError};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use vc_core::{AgentEvent, AgentEventKind, Issue, IssueId, IssueType};
use vc_store::TrackerStore;

/// The process exit code supervisors recognize as "loop halt" (§4.8).
pub const LOOP_HALT_EXIT_CODE: i32 = 42;

#[derive(Debug, Clone)]
pub struct LoopDetectorConfig {
    pub lookback: Duration,
    pub min_events: usize,
    pub halt_confidence_threshold: f64,
}

impl Default for LoopDetectorConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::minutes(10),
            min_events: 5,
            halt_confidence_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopCheckOutcome {
    /// Fewer than `min_events` events in the lookback window.
    TooFewEvents,
    /// The oracle judged the sample not a loop (or unavailable).
    Clear,
    /// A loop was detected past the confidence threshold; a `p0` bug was
    /// filed and the caller should terminate with [`LOOP_HALT_EXIT_CODE`].
    Halt { issue_id: IssueId, verdict_reasoning: String },
}

pub struct LoopDetector<S: TrackerStore> {
    store: Arc<S>,
    events: EventRecorder<S>,
    oracle: Arc<dyn AiSupervisor>,
    config: LoopDetectorConfig,
}

impl<S: TrackerStore> LoopDetector<S> {
    pub fn new(store: Arc<S>, events: EventRecorder<S>, oracle: Arc<dyn AiSupervisor>, config: LoopDetectorConfig) -> Self {
        Self { store, events, oracle, config }
    }

    pub async fn check_once(&self) -> Result<LoopCheckOutcome, String> {
        let sample = self.sample_window().await.map_err(|e| e.to_string())?;
        if sample.len() < self.config.min_events {
            return Ok(LoopCheckOutcome::TooFewEvents);
        }

        let verdict = match self.oracle.detect_loop(&sample).await {
            Ok(v) => v,
            Err(OracleError::Unavailable(_)) | Err(OracleError::Failed(_)) => return Ok(LoopCheckOutcome::Clear),
        };

        if !(verdict.should_halt && verdict.confidence >= self.config.halt_confidence_threshold) {
            return Ok(LoopCheckOutcome::Clear);
        }

        let issue = self.file_escalation(&sample, &verdict).await.map_err(|e| e.to_string())?;
        self.events.emit_severe(AgentEventKind::Other, format!("loop halt: {}", verdict.reasoning), vc_core::Severity::Critical, None).await;
        Ok(LoopCheckOutcome::Halt { issue_id: issue.id, verdict_reasoning: verdict.reasoning })
    }

    async fn sample_window(&self) -> Result<Vec<AgentEvent>, vc_store::StoreError> {
        let events = self.store.get_agent_events(None, 500).await?;
        let cutoff = Utc::now() - self.config.lookback;
        Ok(events.into_iter().filter(|e| e.timestamp >= cutoff).collect())
    }

    async fn file_escalation(&self, sample: &[AgentEvent], verdict: &LoopVerdict) -> Result<Issue, vc_store::StoreError> {
        let mut histogram: HashMap<String, usize> = HashMap::new();
        for event in sample {
            *histogram.entry(format!("{:?}", event.kind)).or_insert(0) += 1;
        }
        let last_50: Vec<&AgentEvent> = sample.iter().rev().take(50).collect();
        let report = format!(
            "Loop detected ({})\nconfidence: {:.2}\ndiagnostic: {}\n\nhistogram: {:?}\n\nlast events: {} sampled\nlookback: {}s, min_events: {}, threshold: {:.2}",
            verdict.loop_type,
            verdict.confidence,
            verdict.diagnostic_summary,
            histogram,
            last_50.len(),
            self.config.lookback.num_seconds(),
            self.config.min_events,
            self.config.halt_confidence_threshold,
        );

        let mut issue = Issue::new(IssueId::new(), "Runaway loop detected — execution halted", Utc::now());
        issue.issue_type = IssueType::Bug;
        issue.priority = 0;
        issue.description = report;
        issue.labels.insert("escalation".to_string());
        self.store.create_issue(issue).await
    }
}

/// Anomaly interventions available to the watchdog (§4.8): escalate with a
/// `p0` bug, file a regular tracked issue, or do nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Intervention {
    Escalate { issue_id: IssueId },
    CreateIssue { issue_id: IssueId },
    NoOp,
}

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub lookback: Duration,
    pub min_events: usize,
    pub escalate_threshold: f64,
    pub issue_threshold: f64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::minutes(10),
            min_events: 5,
            escalate_threshold: 0.8,
            issue_threshold: 0.5,
        }
    }
}

/// A parallel anomaly loop with the same sample-judge-act shape as
/// [`LoopDetector`], but intervening rather than halting the process.
pub struct Watchdog<S: TrackerStore> {
    store: Arc<S>,
    events: EventRecorder<S>,
    oracle: Arc<dyn AiSupervisor>,
    config: WatchdogConfig,
}

impl<S: TrackerStore> Watchdog<S> {
    pub fn new(store: Arc<S>, events: EventRecorder<S>, oracle: Arc<dyn AiSupervisor>, config: WatchdogConfig) -> Self {
        Self { store, events, oracle, config }
    }

    pub async fn check_once(&self) -> Result<Intervention, String> {
        let sample = self.store.get_agent_events(None, 500).await.map_err(|e| e.to_string())?;
        let cutoff = Utc::now() - self.config.lookback;
        let sample: Vec<AgentEvent> = sample.into_iter().filter(|e| e.timestamp >= cutoff).collect();
        if sample.len() < self.config.min_events {
            return Ok(Intervention::NoOp);
        }

        let verdict = match self.oracle.detect_loop(&sample).await {
            Ok(v) => v,
            Err(_) => return Ok(Intervention::NoOp),
        };

        if verdict.confidence >= self.config.escalate_threshold {
            let issue = self.file(&verdict, true).await.map_err(|e| e.to_string())?;
            Ok(Intervention::Escalate { issue_id: issue.id })
        } else if verdict.confidence >= self.config.issue_threshold {
            let issue = self.file(&verdict, false).await.map_err(|e| e.to_string())?;
            Ok(Intervention::CreateIssue { issue_id: issue.id })
        } else {
            Ok(Intervention::NoOp)
        }
    }

    async fn file(&self, verdict: &LoopVerdict, escalate: bool) -> Result<Issue, vc_store::StoreError> {
        let mut issue = Issue::new(IssueId::new(), format!("Anomaly detected: {}", verdict.loop_type), Utc::now());
        issue.issue_type = IssueType::Bug;
        issue.priority = if escalate { 0 } else { 2 };
        issue.description = verdict.reasoning.clone();
        issue.labels.insert("watchdog".to_string());
        if escalate {
            issue.labels.insert("escalation".to_string());
        }
        let created = self.store.create_issue(issue).await?;
        self.events.emit_for_issue(AgentEventKind::Other, "watchdog intervention", created.id.clone()).await;
        Ok(created)
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
