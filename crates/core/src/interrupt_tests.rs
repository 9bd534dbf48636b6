use super::*;

fn sample(now: DateTime<Utc>) -> InterruptMetadata {
    InterruptMetadata::new(
        IssueId::from_str_id("vc-1"),
        InterruptedBy::User,
        "need to check something",
        ExecState::Executing,
        ContextSnapshot {
            todos: vec!["finish the parser".into()],
            progress_summary: Some("halfway through".into()),
            ..Default::default()
        },
        now,
    )
}

#[test]
fn resume_count_is_monotonic() {
    let now = Utc::now();
    let mut meta = sample(now);
    assert_eq!(meta.resume_count, 0);
    meta.mark_resumed(now);
    assert_eq!(meta.resume_count, 1);
    meta.mark_resumed(now);
    assert_eq!(meta.resume_count, 2);
}

#[test]
fn resume_does_not_clear_snapshot() {
    let now = Utc::now();
    let mut meta = sample(now);
    meta.mark_resumed(now);
    assert_eq!(meta.context_snapshot.todos.len(), 1);
}

#[test]
fn resume_context_includes_todos_and_progress() {
    let meta = sample(Utc::now());
    let ctx = meta.resume_context();
    assert!(ctx.contains("halfway through"));
    assert!(ctx.contains("finish the parser"));
}
