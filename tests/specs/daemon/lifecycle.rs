//! Daemon lifecycle specs (§5 shutdown protocol, §6.5 process control):
//! start/stop/status over the `vc` client and the background `vcd` process
//! it manages.

use crate::support::Project;

#[test]
fn daemon_start_reports_success() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes().stdout_has("daemon started");
}

#[test]
fn daemon_status_shows_running_after_start() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    project
        .vc_args(&["status"])
        .passes()
        .stdout_has("executor:")
        .stdout_has("version:")
        .stdout_has("uptime:")
        .stdout_has("executing: (idle)");
}

#[test]
fn daemon_status_reports_idle_with_no_claimed_work() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    project.vc_args(&["status"]).passes().stdout_has("(idle)");
}

#[test]
fn daemon_status_fails_when_not_running() {
    let project = Project::empty();
    project.vc_args(&["status"]).fails().stderr_has("daemon is not running");
}

#[test]
fn starting_twice_reports_already_running() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    project.vc_args(&["start"]).passes().stdout_has("daemon already running");
}

#[test]
fn daemon_stop_reports_success() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    project.vc_args(&["stop"]).passes().stdout_has("daemon stopped");
}

#[test]
fn daemon_status_fails_after_stop() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    project.vc_args(&["stop"]).passes();
    project.vc_args(&["status"]).fails().stderr_has("daemon is not running");
}

#[test]
fn daemon_stop_is_a_noop_when_not_running() {
    let project = Project::empty();
    project.vc_args(&["stop"]).passes().stdout_has("daemon not running");
}

#[test]
fn daemon_creates_socket_and_lock_files_on_start() {
    let project = Project::empty();
    project.vc_args(&["start"]).passes();
    assert!(project.socket_path().exists(), "control socket should exist after start");
    assert!(project.lock_path().exists(), "lock file should exist after start");
}
