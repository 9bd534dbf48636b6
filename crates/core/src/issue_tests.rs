use super::*;
use chrono::Utc;

#[test]
fn new_issue_defaults_to_open_task() {
    let issue = Issue::new(IssueId::from_str_id("vc-1"), "Fix bug", Utc::now());
    assert_eq!(issue.status, IssueStatus::Open);
    assert_eq!(issue.issue_type, IssueType::Task);
    assert!(!issue.is_mission());
}

#[test]
fn has_label_reflects_membership() {
    let mut issue = Issue::new(IssueId::from_str_id("vc-2"), "t", Utc::now());
    assert!(!issue.has_label("baseline-failure"));
    issue.labels.insert("baseline-failure".to_string());
    assert!(issue.has_label("baseline-failure"));
}

#[test]
fn issue_status_display_matches_wire_format() {
    assert_eq!(IssueStatus::InProgress.to_string(), "in_progress");
    assert_eq!(IssueStatus::Closed.to_string(), "closed");
}
