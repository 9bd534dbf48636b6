// SPDX-License-Identifier: MIT

//! `vc`: a thin client over the control socket (§6.2) plus process
//! management for the `vcd` daemon binary. Issue/dependency management,
//! prompt construction, and everything else the tracker owns are out of
//! scope here (§1 Non-goals).

mod client;
mod output;

use clap::{Parser, Subcommand};
use output::OutputFormat;
use vc_core::IssueId;

#[derive(Parser)]
#[command(name = "vc", about = "Control client for the execution-core daemon")]
struct Cli {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the `vcd` daemon in the background.
    Start,
    /// Stop the running `vcd` daemon.
    Stop,
    /// Report the daemon's current status.
    Status,
    /// Request an interrupt of the currently-executing issue.
    Pause {
        issue_id: String,
        #[arg(long, default_value = "requested via control-cli")]
        reason: String,
    },
    /// Clear a prior interrupt and prime resume context.
    Resume { issue_id: String },
    /// List every issue with unresumed interrupt metadata.
    ListInterrupted,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = vc_daemon::Config::load()?;

    match cli.command {
        Command::Start => client::start_daemon(&config).await,
        Command::Stop => client::stop_daemon(&config).await,
        Command::Status => {
            let response = client::send(&config, vc_wire::ControlRequest::Status).await?;
            output::render(&response, cli.format);
            Ok(())
        }
        Command::Pause { issue_id, reason } => {
            let response = client::send(&config, vc_wire::ControlRequest::Pause { issue_id: IssueId::from(issue_id), reason }).await?;
            output::render(&response, cli.format);
            Ok(())
        }
        Command::Resume { issue_id } => {
            let response = client::send(&config, vc_wire::ControlRequest::Resume { issue_id: IssueId::from(issue_id) }).await?;
            output::render(&response, cli.format);
            Ok(())
        }
        Command::ListInterrupted => {
            let response = client::send(&config, vc_wire::ControlRequest::ListInterrupted).await?;
            output::render(&response, cli.format);
            Ok(())
        }
    }
}
