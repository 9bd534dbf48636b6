use super::*;
use crate::events::EventRecorder;
use crate::interrupt_manager::InterruptManager;
use crate::oracle::NoopSupervisor;
use crate::state_machine::RunnerConfig;
use async_trait::async_trait;
use std::time::Duration as StdDuration;
use tempfile::tempdir;
use tokio::process::Command as TokioCommand;
use vc_adapters::{AgentAdapterError, AgentResult, FakeGateProvider, GateProvider, GitVcs};
use vc_core::{FakeClock, Issue, IssueId, IssueStatus, UuidIdGen};
use vc_store::MemoryStore;

struct ScriptedAgent;

#[async_trait]
impl vc_adapters::AgentAdapter for ScriptedAgent {
    fn name(&self) -> &'static str {
        "scripted"
    }
    fn build_args(&self, _prompt: &str, _streaming_json: bool) -> Vec<String> {
        vec![]
    }
    async fn run(&self, _binary: &str, _req: vc_adapters::AgentSpawnRequest, _timeout: StdDuration) -> Result<AgentResult, AgentAdapterError> {
        Ok(AgentResult {
            exit_code: Some(0),
            stdout_sample: "done".to_string(),
            stderr_sample: String::new(),
            completed_at: Utc::now(),
        })
    }
}

async fn init_repo(dir: &std::path::Path) {
    let run = |args: &'static [&'static str]| {
        let mut cmd = TokioCommand::new("git");
        cmd.args(args).current_dir(dir);
        cmd
    };
    run(&["init", "-q"]).status().await.unwrap();
    run(&["config", "user.email", "test@example.com"]).status().await.unwrap();
    run(&["config", "user.name", "Test"]).status().await.unwrap();
    tokio::fs::write(dir.join("a.txt"), "one").await.unwrap();
    run(&["add", "-A"]).status().await.unwrap();
    run(&["commit", "-q", "-m", "initial"]).status().await.unwrap();
}

fn dispatcher(store: Arc<MemoryStore>, repo_path: std::path::PathBuf, gates: Arc<dyn GateProvider>, clock: FakeClock) -> Dispatcher<MemoryStore, FakeClock> {
    let owner = ExecutorId::from_str_id("executor-1");
    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), owner.clone());
    let runner = Arc::new(IssueRunner::new(
        store.clone(),
        events,
        InterruptManager::new(),
        Arc::new(ScriptedAgent),
        gates,
        Arc::new(GitVcs),
        Arc::new(NoopSupervisor),
        Arc::new(RunnerConfig {
            repo_path,
            ..RunnerConfig::default()
        }),
    ));
    Dispatcher::new(
        store,
        runner,
        clock,
        owner,
        DispatcherConfig {
            hostname: "test-host".to_string(),
            pid: 123,
            version: "0.0.0-test".to_string(),
            stale_threshold: Duration::minutes(5),
            stopped_instance_age: Duration::hours(1),
            keep_recent_instances: 3,
        },
    )
}

#[tokio::test]
async fn idle_tick_when_nothing_ready() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());
    let gates: Arc<dyn GateProvider> = Arc::new(FakeGateProvider::all_pass(&["test"]));
    let d = dispatcher(store, dir.path().to_path_buf(), gates, FakeClock::new());
    d.register().await.unwrap();
    assert_eq!(d.tick().await.unwrap(), TickOutcome::Idle);
}

#[tokio::test]
async fn degraded_gate_blocks_claims_until_cleared() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());
    store.create_issue(Issue::new(IssueId::from_str_id("vc-blocked"), "Should stay unclaimed", Utc::now())).await.unwrap();

    let gates: Arc<dyn GateProvider> = Arc::new(FakeGateProvider::all_pass(&["test"]));
    let gate = crate::preflight::DegradedModeGate::new();
    let d = dispatcher(store.clone(), dir.path().to_path_buf(), gates, FakeClock::new()).with_degraded_gate(gate.clone());
    d.register().await.unwrap();

    gate.set(true);
    assert_eq!(d.tick().await.unwrap(), TickOutcome::BlockedDegraded);
    assert!(store.get_execution_state(&IssueId::from_str_id("vc-blocked")).await.unwrap().is_none());

    gate.set(false);
    let TickOutcome::Ran(summary) = d.tick().await.unwrap() else {
        panic!("expected the dispatcher to claim once unblocked");
    };
    assert_eq!(summary.issue_id, IssueId::from_str_id("vc-blocked"));
}

#[tokio::test]
async fn tick_claims_and_runs_one_issue() {
    let repo = tempdir().unwrap();
    init_repo(repo.path()).await;
    tokio::fs::write(repo.path().join("a.txt"), "agent wrote this").await.unwrap();

    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());
    store.create_issue(Issue::new(IssueId::from_str_id("vc-10"), "Ship it", Utc::now())).await.unwrap();

    let gates: Arc<dyn GateProvider> = Arc::new(FakeGateProvider::all_pass(&["test"]));
    let d = dispatcher(store.clone(), repo.path().to_path_buf(), gates, FakeClock::new());
    d.register().await.unwrap();

    let outcome = d.tick().await.unwrap();
    let TickOutcome::Ran(summary) = outcome else {
        panic!("expected Ran, got {outcome:?}");
    };
    assert_eq!(summary.issue_id, IssueId::from_str_id("vc-10"));
    assert_eq!(summary.outcome_kind, "completed_closed");

    let issue = store.get_issue(&IssueId::from_str_id("vc-10")).await.unwrap().unwrap();
    assert_eq!(issue.status, IssueStatus::Closed);

    assert_eq!(d.tick().await.unwrap(), TickOutcome::Idle);
}

#[tokio::test]
async fn stale_sweep_reclaims_abandoned_claim() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());
    let issue = Issue::new(IssueId::from_str_id("vc-11"), "Abandoned", Utc::now());
    store.create_issue(issue.clone()).await.unwrap();

    let clock = FakeClock::new();
    let stale_owner = ExecutorId::from_str_id("dead-executor");
    store
        .register_instance(vc_core::ExecutorInstance::new(stale_owner.clone(), "dead-host".to_string(), 1, "0.0.0".to_string(), clock.utc_now()))
        .await
        .unwrap();
    store.claim_issue(&issue.id, &stale_owner, clock.utc_now()).await.unwrap();
    clock.advance(StdDuration::from_secs(600));

    let gates: Arc<dyn GateProvider> = Arc::new(FakeGateProvider::all_pass(&["test"]));
    let d = dispatcher(store.clone(), dir.path().to_path_buf(), gates, clock);

    let result = d.sweep_stale().await.unwrap();
    assert!(result.reclaimed_issues.contains(&issue.id));
    assert!(result.stale_executors.contains(&stale_owner));

    let state = store.get_execution_state(&issue.id).await.unwrap().unwrap();
    assert_eq!(state.state, vc_core::ExecState::Pending);
    assert!(state.owner.is_none());

    let reopened = store.get_issue(&issue.id).await.unwrap().unwrap();
    assert_eq!(reopened.status, IssueStatus::Open);
}
