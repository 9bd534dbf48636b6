use super::*;
use async_trait::async_trait;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::process::Command as TokioCommand;
use vc_adapters::{FakeGateProvider, GateError, GitVcs};
use vc_core::{ExecutorId, UuidIdGen};
use vc_store::MemoryStore;

/// A `GateProvider` that always fails the whole run, as if the shell-out
/// itself errored (not merely a gate exiting non-zero).
struct AlwaysErrorsGateProvider;

#[async_trait]
impl GateProvider for AlwaysErrorsGateProvider {
    async fn run_all(&self, _cwd: &Path) -> Result<(Vec<vc_core::GateResult>, bool), GateError> {
        Err(GateError::Execution("simulated toolchain crash".to_string()))
    }
}

async fn init_repo(dir: &Path) {
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

fn checker(
    store: Arc<MemoryStore>,
    gates: Arc<dyn GateProvider>,
    failure_mode: FailureMode,
) -> PreflightChecker<MemoryStore> {
    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), ExecutorId::from_str_id("executor-1"));
    PreflightChecker::new(store, events, gates, Arc::new(GitVcs), Duration::minutes(5), failure_mode)
}

#[tokio::test]
async fn passing_baseline_caches_and_hits_memory_second_time() {
    let repo = tempdir().unwrap();
    init_repo(repo.path()).await;
    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());

    let gates: Arc<dyn GateProvider> = Arc::new(FakeGateProvider::all_pass(&["test", "lint", "build"]));
    let checker = checker(store, gates, FailureMode::Block);

    let first = checker.check(repo.path()).await.unwrap();
    assert!(first.all_passed);
    assert!(!first.should_block);

    let second = checker.check(repo.path()).await.unwrap();
    assert!(second.all_passed);
}

#[tokio::test]
async fn degraded_mode_creates_one_system_issue_per_failing_gate() {
    let repo = tempdir().unwrap();
    init_repo(repo.path()).await;
    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());

    let gates: Arc<dyn GateProvider> = Arc::new(
        FakeGateProvider::all_pass(&["test", "lint", "build"])
            .with_failure("test", "boom")
            .with_failure("lint", "boom2"),
    );
    let checker = checker(store.clone(), gates, FailureMode::Block);

    let outcome = checker.check(repo.path()).await.unwrap();
    assert!(!outcome.all_passed);
    assert!(outcome.should_block);

    let test_issue = store.get_issue(&vc_core::IssueId::from_str_id("vc-baseline-test")).await.unwrap();
    let lint_issue = store.get_issue(&vc_core::IssueId::from_str_id("vc-baseline-lint")).await.unwrap();
    assert!(test_issue.is_some());
    assert!(lint_issue.is_some());
    assert!(test_issue.unwrap().has_label("gate:test"));

    // Second run with the same failures: no duplicate issues.
    let before_count = store.search_issues(&|i| i.has_label("baseline-failure")).await.unwrap().len();
    checker.check(repo.path()).await.unwrap();
    let after_count = store.search_issues(&|i| i.has_label("baseline-failure")).await.unwrap().len();
    assert_eq!(before_count, after_count);
}

#[tokio::test]
async fn reopening_a_closed_baseline_issue_updates_notes() {
    let repo = tempdir().unwrap();
    init_repo(repo.path()).await;
    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());

    let failing: Arc<dyn GateProvider> = Arc::new(FakeGateProvider::all_pass(&["test"]).with_failure("test", "boom"));
    let checker = checker(store.clone(), failing, FailureMode::Warn);
    checker.check(repo.path()).await.unwrap();

    let id = vc_core::IssueId::from_str_id("vc-baseline-test");
    store.close_issue(&id).await.unwrap();

    checker.check(repo.path()).await.unwrap();
    let reopened = store.get_issue(&id).await.unwrap().unwrap();
    assert_eq!(reopened.status, vc_core::IssueStatus::Open);
    assert!(reopened.comments.iter().any(|c| c.contains("Gate failed again")));
}

#[tokio::test]
async fn gate_provider_error_is_a_failing_baseline_not_a_silent_pass() {
    let repo = tempdir().unwrap();
    init_repo(repo.path()).await;
    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());

    let gates: Arc<dyn GateProvider> = Arc::new(AlwaysErrorsGateProvider);
    let checker = checker(store.clone(), gates, FailureMode::Block);

    let outcome = checker.check(repo.path()).await.unwrap();
    assert!(!outcome.all_passed);
    assert!(outcome.should_block);
    assert_eq!(outcome.failing_gates, vec!["pre-flight".to_string()]);

    let issue = store.get_issue(&vc_core::IssueId::from_str_id("vc-baseline-pre-flight")).await.unwrap();
    assert!(issue.is_some(), "a gate-run error must still open a degraded-mode system issue");
}

#[tokio::test]
async fn warn_mode_does_not_block() {
    let repo = tempdir().unwrap();
    init_repo(repo.path()).await;
    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());

    let failing: Arc<dyn GateProvider> = Arc::new(FakeGateProvider::all_pass(&["test"]).with_failure("test", "boom"));
    let checker = checker(store, failing, FailureMode::Warn);

    let outcome = checker.check(repo.path()).await.unwrap();
    assert!(!outcome.all_passed);
    assert!(!outcome.should_block);
}
