use super::*;
use crate::events::EventRecorder;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::process::Command as TokioCommand;
use vc_adapters::{FakeGateProvider, GitVcs};
use vc_core::{ExecutorId, Issue, IssueId, UuidIdGen};
use vc_store::MemoryStore;

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

async fn single_test_gate_failure() -> GateOutcome {
    let provider = FakeGateProvider::all_pass(&["test", "lint", "build"]).with_failure("test", "assertion failed");
    let (results, all_passed) = provider.run_all(Path::new(".")).await.unwrap();
    GateOutcome { results, all_passed }
}

#[tokio::test]
async fn failed_gates_excludes_passing_gates() {
    let outcome = single_test_gate_failure().await;
    assert_eq!(outcome.failed_gates(), vec!["test".to_string()]);
    assert_eq!(outcome.failure_count(), 1);
    assert!(outcome.full_logs().contains("test Gate Failure"));
    assert!(!outcome.full_logs().contains("lint Gate Failure"));
}

#[tokio::test]
async fn rollback_labels_logs_and_resets_tree() {
    let repo = tempdir().unwrap();
    init_repo(repo.path()).await;
    tokio::fs::write(repo.path().join("a.txt"), "dirty-attempt").await.unwrap();

    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());
    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), ExecutorId::from_str_id("executor-1"));

    let mut issue = Issue::new(IssueId::from_str_id("vc-4"), "Fix thing", chrono::Utc::now());
    store.create_issue(issue.clone()).await.unwrap();

    let outcome = single_test_gate_failure().await;
    rollback(store.as_ref(), &events, &GitVcs, &mut issue, repo.path(), outcome).await;

    let persisted = store.get_issue(&issue.id).await.unwrap().unwrap();
    assert!(persisted.has_label("quality-gates-failed"));
    assert!(persisted.comments.iter().any(|c| c.contains("test Gate Failure")));
    assert!(!persisted.comments.iter().any(|c| c.contains("lint Gate Failure")));

    let content = tokio::fs::read_to_string(repo.path().join("a.txt")).await.unwrap();
    assert_eq!(content, "one");
}

#[tokio::test]
async fn rollback_is_best_effort_on_reset_failure() {
    // A directory that is not a git repo: `hard_reset` fails, but rollback
    // still labels the issue and never panics (§4.4 step 3: best-effort).
    let not_a_repo = tempdir().unwrap();

    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());
    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), ExecutorId::from_str_id("executor-1"));

    let mut issue = Issue::new(IssueId::from_str_id("vc-5"), "Fix thing", chrono::Utc::now());
    store.create_issue(issue.clone()).await.unwrap();

    let outcome = single_test_gate_failure().await;
    rollback(store.as_ref(), &events, &GitVcs, &mut issue, not_a_repo.path(), outcome).await;

    let persisted = store.get_issue(&issue.id).await.unwrap().unwrap();
    assert!(persisted.has_label("quality-gates-failed"));
    assert!(persisted.comments.iter().any(|c| c.contains("Automatic rollback failed")));
}
