use super::*;

#[test]
fn claude_code_argv_includes_permission_bypass() {
    let adapter = ClaudeCodeAdapter;
    let args = adapter.build_args("do the thing", false);
    assert_eq!(args, vec!["--print", "--dangerously-skip-permissions", "do the thing"]);
}

#[test]
fn claude_code_streaming_argv_matches_spec() {
    let adapter = ClaudeCodeAdapter;
    let args = adapter.build_args("do the thing", true);
    assert_eq!(
        args,
        vec![
            "--print",
            "--dangerously-skip-permissions",
            "--verbose",
            "--output-format",
            "stream-json",
            "do the thing",
        ]
    );
}

#[test]
fn amp_argv_includes_permission_bypass() {
    let adapter = AmpAdapter;
    let args = adapter.build_args("do the thing", false);
    assert_eq!(args, vec!["--dangerously-allow-all", "--execute", "do the thing"]);
}

#[test]
fn amp_streaming_argv_appends_stream_json() {
    let adapter = AmpAdapter;
    let args = adapter.build_args("do the thing", true);
    assert_eq!(args, vec!["--dangerously-allow-all", "--execute", "do the thing", "--stream-json"]);
}

#[tokio::test]
async fn claude_code_run_against_a_real_binary_surfaces_exit_code() {
    // Use `echo` standing in for the coding-agent binary: argv is printed to
    // stdout and the process exits 0, letting us assert on the wait contract
    // without depending on a real coding agent being installed.
    let adapter = ClaudeCodeAdapter;
    let req = AgentSpawnRequest {
        prompt: "hello".into(),
        working_dir: std::env::temp_dir(),
        streaming_json: false,
    };
    let result = adapter.run("echo", req, std::time::Duration::from_secs(5)).await.unwrap();
    assert_eq!(result.exit_code, Some(0));
    assert!(result.stdout_sample.contains("--dangerously-skip-permissions"));
}
