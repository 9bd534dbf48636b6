//! Control-socket RPC specs (§6.2): pause/resume/list-interrupted
//! validation against a running daemon with no claimed work.

use crate::support::Project;

#[test]
fn pause_fails_when_no_task_executing() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    project
        .vc_args(&["pause", "vc-no-such-issue"])
        .passes()
        .stderr_has("no task currently executing");
}

#[test]
fn resume_fails_for_issue_with_no_interrupt() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    project
        .vc_args(&["resume", "vc-no-such-issue"])
        .passes()
        .stderr_has("has no recorded interrupt");
}

#[test]
fn list_interrupted_is_empty_initially() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    project
        .vc_args(&["list-interrupted"])
        .passes()
        .stdout_has("no interrupted issues");
}

#[test]
fn pause_and_resume_fail_when_daemon_not_running() {
    let project = Project::empty();
    project
        .vc_args(&["pause", "vc-1"])
        .fails()
        .stderr_has("daemon is not running");
    project
        .vc_args(&["resume", "vc-1"])
        .fails()
        .stderr_has("daemon is not running");
}

#[test]
fn status_json_format_is_valid_json() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    let output = project.vc_args(&["--format", "json", "status"]).passes();
    let parsed: serde_json::Value = serde_json::from_str(&output.stdout).expect("status --format json should be valid JSON");
    assert_eq!(parsed.get("type").and_then(|v| v.as_str()), Some("Status"), "expected a Status variant, got: {parsed}");
}
