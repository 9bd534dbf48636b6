use super::*;
use crate::oracle::{ExecutionAnalysis, PreAssessment};
use async_trait::async_trait;
use tempfile::tempdir;
use vc_core::{Issue as CoreIssue, UuidIdGen};
use vc_store::MemoryStore;

struct FixedOracle {
    verdict: LoopVerdict,
}

#[async_trait]
impl AiSupervisor for FixedOracle {
    async fn pre_assess(&self, _issue: &CoreIssue) -> Result<PreAssessment, OracleError> {
        Err(OracleError::Unavailable("not needed".into()))
    }
    async fn analyze_execution(&self, _issue: &CoreIssue, _out: &str, _err: &str) -> Result<ExecutionAnalysis, OracleError> {
        Err(OracleError::Unavailable("not needed".into()))
    }
    async fn assess_completion(&self, _epic: &CoreIssue, _children: &[CoreIssue]) -> Result<crate::oracle::CompletionAssessment, OracleError> {
        Err(OracleError::Unavailable("not needed".into()))
    }
    async fn detect_loop(&self, _recent_events: &[AgentEvent]) -> Result<LoopVerdict, OracleError> {
        Ok(self.verdict.clone())
    }
}

async fn seed_events(store: Arc<MemoryStore>, n: usize) {
    let recorder = EventRecorder::new(store, Arc::new(UuidIdGen), vc_core::ExecutorId::from_str_id("e-1"));
    for _ in 0..n {
        recorder.emit(AgentEventKind::Other, "noise").await;
    }
}

fn halting_verdict() -> LoopVerdict {
    LoopVerdict {
        should_halt: true,
        confidence: 0.95,
        loop_type: "repeated-edit".to_string(),
        reasoning: "same file edited 12 times with no progress".to_string(),
        diagnostic_summary: "stuck".to_string(),
    }
}

#[tokio::test]
async fn too_few_events_is_a_noop() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());
    seed_events(store.clone(), 2).await;

    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), vc_core::ExecutorId::from_str_id("e-1"));
    let detector = LoopDetector::new(store, events, Arc::new(FixedOracle { verdict: halting_verdict() }), LoopDetectorConfig::default());
    assert_eq!(detector.check_once().await.unwrap(), LoopCheckOutcome::TooFewEvents);
}

#[tokio::test]
async fn halting_verdict_files_p0_escalation() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());
    seed_events(store.clone(), 10).await;

    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), vc_core::ExecutorId::from_str_id("e-1"));
    let detector = LoopDetector::new(store.clone(), events, Arc::new(FixedOracle { verdict: halting_verdict() }), LoopDetectorConfig::default());

    let outcome = detector.check_once().await.unwrap();
    let LoopCheckOutcome::Halt { issue_id, .. } = outcome else {
        panic!("expected Halt");
    };
    let issue = store.get_issue(&issue_id).await.unwrap().unwrap();
    assert_eq!(issue.priority, 0);
    assert!(issue.has_label("escalation"));
}

#[tokio::test]
async fn low_confidence_verdict_stays_clear() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());
    seed_events(store.clone(), 10).await;

    let mut verdict = halting_verdict();
    verdict.confidence = 0.2;
    verdict.should_halt = false;

    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), vc_core::ExecutorId::from_str_id("e-1"));
    let detector = LoopDetector::new(store, events, Arc::new(FixedOracle { verdict }), LoopDetectorConfig::default());
    assert_eq!(detector.check_once().await.unwrap(), LoopCheckOutcome::Clear);
}

#[tokio::test]
async fn watchdog_escalates_above_threshold_and_files_plain_issue_mid_range() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());
    seed_events(store.clone(), 10).await;

    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), vc_core::ExecutorId::from_str_id("e-1"));
    let watchdog = Watchdog::new(store.clone(), events, Arc::new(FixedOracle { verdict: halting_verdict() }), WatchdogConfig::default());
    let intervention = watchdog.check_once().await.unwrap();
    assert!(matches!(intervention, Intervention::Escalate { .. }));

    let mut mid = halting_verdict();
    mid.confidence = 0.6;
    let events2 = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), vc_core::ExecutorId::from_str_id("e-1"));
    let watchdog2 = Watchdog::new(store, events2, Arc::new(FixedOracle { verdict: mid }), WatchdogConfig::default());
    let intervention2 = watchdog2.check_once().await.unwrap();
    assert!(matches!(intervention2, Intervention::CreateIssue { .. }));
}
