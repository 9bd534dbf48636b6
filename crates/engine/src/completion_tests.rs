use super::*;
use crate::oracle::NoopSupervisor;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::process::Command as TokioCommand;
use vc_adapters::GitVcs;
use vc_core::{Dependency, ExecutorId, Issue, IssueStatus, IssueSubtype, IssueType, UuidIdGen};
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

fn engine(store: Arc<MemoryStore>, repo_root: std::path::PathBuf) -> CompletionEngine<MemoryStore> {
    let events = EventRecorder::new(store.clone(), Arc::new(UuidIdGen), ExecutorId::from_str_id("executor-1"));
    CompletionEngine::new(store, events, Arc::new(NoopSupervisor), Arc::new(GitVcs), repo_root)
}

async fn link(store: &MemoryStore, child: &IssueId, parent: &IssueId) {
    store
        .add_dependency(Dependency {
            issue: child.clone(),
            depends_on: parent.clone(),
            dependency_type: DependencyType::ParentChild,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn fallback_closes_epic_only_when_all_children_closed() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());

    let epic = Issue::new(IssueId::from_str_id("epic-1"), "Epic", Utc::now());
    let mut epic = epic;
    epic.issue_type = IssueType::Epic;
    store.create_issue(epic.clone()).await.unwrap();

    let child_a = Issue::new(IssueId::from_str_id("task-a"), "A", Utc::now());
    let child_b = Issue::new(IssueId::from_str_id("task-b"), "B", Utc::now());
    store.create_issue(child_a.clone()).await.unwrap();
    store.create_issue(child_b.clone()).await.unwrap();
    link(&store, &child_a.id, &epic.id).await;
    link(&store, &child_b.id, &epic.id).await;

    let eng = engine(store.clone(), dir.path().to_path_buf());

    store.close_issue(&child_a.id).await.unwrap();
    eng.on_child_closed(&child_a.id).await;
    assert_ne!(store.get_issue(&epic.id).await.unwrap().unwrap().status, IssueStatus::Closed);

    store.close_issue(&child_b.id).await.unwrap();
    eng.on_child_closed(&child_b.id).await;
    assert_eq!(store.get_issue(&epic.id).await.unwrap().unwrap().status, IssueStatus::Closed);
}

#[tokio::test]
async fn closing_epic_recurses_to_grandparent_mission_and_runs_cleanup() {
    let repo = tempdir().unwrap();
    init_repo(repo.path()).await;
    let sandbox = tempdir().unwrap();
    let sandbox_path = sandbox.path().join("mission-sandbox");
    TokioCommand::new("git")
        .args(["worktree", "add", "-b", "mission/1", sandbox_path.to_str().unwrap()])
        .current_dir(repo.path())
        .status()
        .await
        .unwrap();

    let store_dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(store_dir.path()).unwrap());

    let mut mission = Issue::new(IssueId::from_str_id("mission-1"), "Mission", Utc::now());
    mission.issue_type = IssueType::Epic;
    store
        .create_mission(mission.clone(), sandbox_path.to_string_lossy().into_owned(), "mission/1".to_string())
        .await
        .unwrap();
    let mission_id = mission.id.clone();

    let mut epic = Issue::new(IssueId::from_str_id("epic-1"), "Phase", Utc::now());
    epic.issue_type = IssueType::Epic;
    epic.subtype = IssueSubtype::Phase;
    store.create_issue(epic.clone()).await.unwrap();
    link(&store, &epic.id, &mission_id).await;

    let child = Issue::new(IssueId::from_str_id("task-1"), "Task", Utc::now());
    store.create_issue(child.clone()).await.unwrap();
    link(&store, &child.id, &epic.id).await;

    let eng = engine(store.clone(), repo.path().to_path_buf());

    store.close_issue(&child.id).await.unwrap();
    eng.on_child_closed(&child.id).await;

    let persisted_epic = store.get_issue(&epic.id).await.unwrap().unwrap();
    assert_eq!(persisted_epic.status, IssueStatus::Closed);

    let persisted_mission = store.get_mission(&mission_id).await.unwrap().unwrap();
    assert_eq!(persisted_mission.status, IssueStatus::Closed);
    assert!(persisted_mission.has_label(crate::gate_worker::NEEDS_QUALITY_GATES));
    assert!(persisted_mission.mission.sandbox_path.is_none());
    assert!(persisted_mission.mission.branch_name.is_none());
    assert!(!sandbox_path.exists());
}

#[tokio::test]
async fn closed_parent_with_no_children_is_left_alone() {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::in_memory_for_tests(dir.path()).unwrap());
    let mut epic = Issue::new(IssueId::from_str_id("epic-lonely"), "Epic", Utc::now());
    epic.issue_type = IssueType::Epic;
    store.create_issue(epic.clone()).await.unwrap();

    let eng = engine(store.clone(), dir.path().to_path_buf());
    eng.reconsider(&epic.id).await;
    assert_ne!(store.get_issue(&epic.id).await.unwrap().unwrap().status, IssueStatus::Closed);
}
