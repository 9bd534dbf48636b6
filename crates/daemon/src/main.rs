// SPDX-License-Identifier: MIT

//! `vcd`: the execution-core daemon. Acquires a single-instance lock,
//! builds and spawns every loop via [`vc_daemon::app::start`], then waits
//! for SIGTERM/SIGINT or a loop-detector halt before running the shutdown
//! protocol (§5) and exiting.

use fs2::FileExt;
use std::io::Write;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use vc_daemon::{app, Config};

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("vcd: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("vcd: failed to set up logging: {e}");
            std::process::exit(1);
        }
    };

    let _lock_file = match acquire_lock(&config) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("vcd: another instance is already running ({e})");
            std::process::exit(1);
        }
    };

    let executor_id = vc_core::ExecutorId::new();
    let hostname = hostname();
    let pid = std::process::id();

    info!(executor_id = %executor_id, %hostname, pid, "starting execution-core daemon");

    let daemon = match app::start(config, executor_id, hostname, pid).await {
        Ok(d) => d,
        Err(e) => {
            error!(error = %e, "daemon failed to start");
            std::process::exit(1);
        }
    };

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            std::process::exit(1);
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGINT handler");
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        _ = daemon.shutdown.triggered() => info!("internal shutdown signal observed"),
    }

    let halt_code = *daemon.halt_code.lock();
    daemon.stop(std::time::Duration::from_secs(30)).await;

    if let Some(code) = halt_code {
        std::process::exit(code);
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-host".to_string())
}

/// Single-instance guard (§9): exclusive lock on `lock_path`, PID written
/// after the lock is held so a stale file never claims ownership it lost.
fn acquire_lock(config: &Config) -> std::io::Result<std::fs::File> {
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    file.try_lock_exclusive().map_err(|e| std::io::Error::other(format!("lock held: {e}")))?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

fn setup_logging(config: &Config) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = config.log_path.parent().ok_or_else(|| std::io::Error::other("log path has no parent"))?;
    let file_name = config.log_path.file_name().ok_or_else(|| std::io::Error::other("log path has no file name"))?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
