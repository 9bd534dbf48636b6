//! CLI help output specs.

use crate::support::Project;

#[test]
fn vc_help_shows_usage() {
    let project = Project::empty();
    project.vc_args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn vc_help_lists_subcommands() {
    let project = Project::empty();
    project
        .vc_args(&["--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status")
        .stdout_has("pause")
        .stdout_has("resume");
}

#[test]
fn vc_status_help_shows_usage() {
    let project = Project::empty();
    project.vc_args(&["status", "--help"]).passes().stdout_has("Usage:");
}
