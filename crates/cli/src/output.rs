// SPDX-License-Identifier: MIT

//! Text/JSON rendering for control-socket responses.

use clap::ValueEnum;
use vc_wire::ControlResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render(response: &ControlResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            match serde_json::to_string_pretty(response) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("failed to serialize response: {e}"),
            }
        }
        OutputFormat::Text => render_text(response),
    }
}

fn render_text(response: &ControlResponse) {
    match response {
        ControlResponse::Status {
            executor_id,
            hostname,
            pid,
            version,
            uptime_secs,
            current_issue,
        } => {
            println!("executor:  {executor_id}");
            println!("host:      {hostname} (pid {pid})");
            println!("version:   {version}");
            println!("uptime:    {uptime_secs}s");
            match current_issue {
                Some(id) => println!("executing: {id}"),
                None => println!("executing: (idle)"),
            }
        }
        ControlResponse::InterruptRequested { issue_id, reason } => {
            println!("interrupt requested for {issue_id}: {reason}");
        }
        ControlResponse::Resumed { issue_id } => {
            println!("resumed {issue_id}");
        }
        ControlResponse::Interrupted { issues } => {
            if issues.is_empty() {
                println!("no interrupted issues");
            }
            for entry in issues {
                println!(
                    "{}  interrupted_by={:?}  at={}  state={:?}  resumes={}  reason={}",
                    entry.issue_id, entry.interrupted_by, entry.interrupted_at, entry.execution_state_at_interruption, entry.resume_count, entry.reason
                );
            }
        }
        ControlResponse::Error { message } => {
            eprintln!("error: {message}");
        }
    }
}
