// SPDX-License-Identifier: MIT

use super::*;
use vc_core::IssueId;

fn issue(n: &str) -> IssueId {
    IssueId::from_str_id(n)
}

#[test]
fn request_fails_for_untracked_issue() {
    let mgr = InterruptManager::new();
    assert!(!mgr.request(&issue("vc-1"), InterruptedBy::User, "stop"));
}

#[test]
fn track_then_request_then_take() {
    let mgr = InterruptManager::new();
    let id = issue("vc-1");
    mgr.track(&id);
    assert!(!mgr.is_requested(&id));

    assert!(mgr.request(&id, InterruptedBy::ControlCli, "pause please"));
    assert!(mgr.is_requested(&id));

    let pending = mgr.take(&id).expect("pending interrupt");
    assert_eq!(pending.reason, "pause please");
    assert_eq!(pending.interrupted_by, InterruptedBy::ControlCli);
    assert!(!mgr.is_requested(&id));
}

#[test]
fn untrack_clears_state() {
    let mgr = InterruptManager::new();
    let id = issue("vc-1");
    mgr.track(&id);
    mgr.request(&id, InterruptedBy::User, "x");
    mgr.untrack(&id);
    assert!(!mgr.is_tracked(&id));
    assert!(!mgr.request(&id, InterruptedBy::User, "x"));
}

#[test]
fn tracked_issues_lists_in_flight() {
    let mgr = InterruptManager::new();
    mgr.track(&issue("a"));
    mgr.track(&issue("b"));
    let mut tracked: Vec<String> = mgr.tracked_issues().into_iter().map(|i| i.0).collect();
    tracked.sort();
    assert_eq!(tracked, vec!["a".to_string(), "b".to_string()]);
}
