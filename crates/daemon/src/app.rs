// SPDX-License-Identifier: MIT

//! Daemon wiring (§5): builds every engine component from one [`Config`],
//! spawns each independent loop against the shared [`Shutdown`] signal, and
//! hands back a handle the binary waits on.

use crate::config::{AgentVariant, Config};
use crate::control::{self, ControlState};
use crate::shutdown::{Shutdown, WaitGroup};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vc_adapters::{AgentAdapter, AmpAdapter, ClaudeCodeAdapter, GitVcs, ShellGateProvider};
use vc_core::{SystemClock, UuidIdGen};
use vc_engine::{
    CompletionEngine, Dispatcher, DispatcherConfig, FailureMode, GateWorker, IssueRunner, LoopDetector, LoopDetectorConfig, NoopSupervisor,
    PreflightChecker, RunnerConfig, TickOutcome, Watchdog, WatchdogConfig, LOOP_HALT_EXIT_CODE,
};
use vc_engine::EventRecorder;
use vc_engine::InterruptManager;
use vc_store::MemoryStore;

/// Everything the binary needs after startup: the wait-group to join on
/// shutdown, the shared signal to trigger it, and the exit code a halted
/// loop detector asked for (if any).
pub struct RunningDaemon {
    pub shutdown: Shutdown,
    pub wait_group: WaitGroup,
    pub socket_path: std::path::PathBuf,
    pub halt_code: Arc<parking_lot::Mutex<Option<i32>>>,
    dispatcher: Arc<Dispatcher<MemoryStore, SystemClock>>,
}

impl RunningDaemon {
    /// Shutdown protocol in order (§5): signal every loop, wait (bounded)
    /// for in-flight subprocesses and gate runs via the wait-group, mark
    /// this instance stopped, then clean up stale peer rows. Best-effort
    /// past the first step — a cleanup failure never blocks process exit.
    pub async fn stop(self, grace: Duration) {
        self.shutdown.trigger();
        self.wait_group.join(grace).await;
        self.dispatcher.mark_stopped().await;
        if let Err(e) = self.dispatcher.cleanup_peers().await {
            warn!(error = %e, "peer cleanup failed during shutdown");
        }
        info!("daemon stopped");
    }
}

/// Build every component and spawn every loop. Does not block; the caller
/// awaits `wait_group.join(..)` after installing its own signal handler.
pub async fn start(config: Config, executor_id: vc_core::ExecutorId, hostname: String, pid: u32) -> std::io::Result<RunningDaemon> {
    std::fs::create_dir_all(&config.state_dir)?;
    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let store = Arc::new(MemoryStore::open(&config.wal_path, Some(&config.snapshot_path)).map_err(std::io::Error::other)?);
    let id_gen: Arc<dyn vc_core::IdGen> = Arc::new(UuidIdGen);
    let events = EventRecorder::new(store.clone(), id_gen, executor_id.clone());
    let clock = SystemClock;

    let oracle = Arc::new(NoopSupervisor);
    let vcs = Arc::new(GitVcs);
    let gates = Arc::new(ShellGateProvider::standard(config.preflight_gates_timeout));
    let agent: Arc<dyn AgentAdapter> = match config.agent_variant {
        AgentVariant::ClaudeCode => Arc::new(ClaudeCodeAdapter),
        AgentVariant::Amp => Arc::new(AmpAdapter),
    };
    let interrupts = InterruptManager::new();

    let runner_config = Arc::new(RunnerConfig {
        agent_binary: config.agent_binary.clone(),
        agent_timeout: config.agent_timeout,
        streaming_json: config.agent_streaming_json,
        auto_commit: config.auto_commit,
        commit_message_template: config.commit_message_template.clone(),
        repo_path: config.repo_path.clone(),
    });
    let runner = Arc::new(IssueRunner::new(
        store.clone(),
        events.clone(),
        interrupts.clone(),
        agent,
        gates.clone(),
        vcs.clone(),
        oracle.clone(),
        runner_config,
    ));

    let dispatcher_config = DispatcherConfig {
        hostname: hostname.clone(),
        pid,
        version: config.version.clone(),
        stale_threshold: to_chrono(config.stale_threshold),
        stopped_instance_age: to_chrono(config.stopped_instance_age),
        keep_recent_instances: config.keep_recent_instances,
    };
    let preflight = Arc::new(PreflightChecker::new(
        store.clone(),
        events.clone(),
        gates.clone(),
        vcs.clone(),
        to_chrono(config.preflight_cache_ttl),
        config.preflight_failure_mode,
    ));

    let mut dispatcher = Dispatcher::new(store.clone(), runner, clock, executor_id.clone(), dispatcher_config);
    if config.preflight_enabled {
        dispatcher = dispatcher.with_degraded_gate(preflight.gate());
    }
    let dispatcher = Arc::new(dispatcher);
    dispatcher.register().await.map_err(std::io::Error::other)?;
    if let Err(e) = dispatcher.sweep_stale().await {
        warn!(error = %e, "startup stale sweep failed");
    }

    let completion = Arc::new(CompletionEngine::new(store.clone(), events.clone(), oracle.clone(), vcs.clone(), config.repo_path.clone()));
    let gate_worker = Arc::new(GateWorker::new(store.clone(), events.clone(), gates.clone(), executor_id.clone()));
    let loop_detector = Arc::new(LoopDetector::new(
        store.clone(),
        events.clone(),
        oracle.clone(),
        LoopDetectorConfig {
            lookback: to_chrono(config.loop_detector_lookback_window),
            min_events: 5,
            halt_confidence_threshold: config.loop_detector_min_confidence,
        },
    ));
    let watchdog = Arc::new(Watchdog::new(
        store.clone(),
        events.clone(),
        oracle,
        WatchdogConfig {
            lookback: to_chrono(config.watchdog_lookback_window),
            min_events: 5,
            escalate_threshold: config.watchdog_escalate_threshold,
            issue_threshold: config.watchdog_issue_threshold,
        },
    ));

    let shutdown = Shutdown::new();
    let mut wait_group = WaitGroup::default();
    let halt_code = Arc::new(parking_lot::Mutex::new(None));

    wait_group.track(spawn_dispatch_loop(dispatcher.clone(), completion, config.dispatch_interval, shutdown.clone()));
    wait_group.track(spawn_stale_sweep_loop(dispatcher.clone(), config.stale_sweep_interval, shutdown.clone()));

    if config.preflight_enabled {
        wait_group.track(spawn_preflight_loop(preflight, config.repo_path.clone(), config.dispatch_interval, shutdown.clone()));
    }
    wait_group.track(spawn_gate_worker_loop(gate_worker, config.gate_worker_interval, shutdown.clone()));

    if config.loop_detector_enabled {
        wait_group.track(spawn_loop_detector_loop(loop_detector, config.loop_detector_check_interval, shutdown.clone(), halt_code.clone()));
    }
    if config.watchdog_enabled {
        wait_group.track(spawn_watchdog_loop(watchdog, config.watchdog_check_interval, shutdown.clone()));
    }
    wait_group.track(spawn_event_cleanup_loop(store.clone(), config.clone(), shutdown.clone()));

    let control_state = ControlState {
        store,
        interrupts,
        executor_id,
        hostname,
        pid,
        version: config.version.clone(),
        started_at: std::time::Instant::now(),
    };
    let listener = control::bind(&config.socket_path)?;
    let control_shutdown = shutdown.clone();
    wait_group.track(tokio::spawn(async move {
        control::serve(listener, control_state, control_shutdown).await;
    }));

    Ok(RunningDaemon {
        shutdown,
        wait_group,
        socket_path: config.socket_path,
        halt_code,
        dispatcher,
    })
}

fn to_chrono(d: Duration) -> ChronoDuration {
    ChronoDuration::from_std(d).unwrap_or_else(|_| ChronoDuration::seconds(d.as_secs() as i64))
}

fn spawn_dispatch_loop<S: vc_store::TrackerStore + 'static, C: vc_core::Clock>(
    dispatcher: Arc<Dispatcher<S, C>>,
    completion: Arc<CompletionEngine<S>>,
    interval: Duration,
    shutdown: Shutdown,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    match dispatcher.tick().await {
                        Ok(TickOutcome::Ran(summary)) if summary.outcome_kind == "completed_closed" => {
                            completion.on_child_closed(&summary.issue_id).await;
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "dispatch tick failed"),
                    }
                }
            }
        }
        info!("dispatch loop stopped");
    })
}

fn spawn_stale_sweep_loop<S: vc_store::TrackerStore + 'static, C: vc_core::Clock>(
    dispatcher: Arc<Dispatcher<S, C>>,
    interval: Duration,
    shutdown: Shutdown,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    if let Err(e) = dispatcher.sweep_stale().await {
                        warn!(error = %e, "stale sweep failed");
                    }
                }
            }
        }
        info!("stale sweep loop stopped");
    })
}

fn spawn_preflight_loop<S: vc_store::TrackerStore + 'static>(
    preflight: Arc<PreflightChecker<S>>,
    repo_path: std::path::PathBuf,
    interval: Duration,
    shutdown: Shutdown,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    match preflight.check(&repo_path).await {
                        Ok(outcome) if outcome.should_block => {
                            warn!(failing_gates = ?outcome.failing_gates, "pre-flight degraded mode blocking new work");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "pre-flight check failed"),
                    }
                }
            }
        }
        info!("pre-flight loop stopped");
    })
}

fn spawn_gate_worker_loop<S: vc_store::TrackerStore + 'static>(
    worker: Arc<GateWorker<S>>,
    interval: Duration,
    shutdown: Shutdown,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    if let Err(e) = worker.run_once().await {
                        warn!(error = %e, "gate worker cycle failed");
                    }
                }
            }
        }
        info!("gate worker loop stopped");
    })
}

fn spawn_loop_detector_loop<S: vc_store::TrackerStore + 'static>(
    detector: Arc<LoopDetector<S>>,
    interval: Duration,
    shutdown: Shutdown,
    halt_code: Arc<parking_lot::Mutex<Option<i32>>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    match detector.check_once().await {
                        Ok(vc_engine::LoopCheckOutcome::Halt { issue_id, verdict_reasoning }) => {
                            error!(issue = %issue_id, reasoning = %verdict_reasoning, "loop detector halting executor");
                            *halt_code.lock() = Some(LOOP_HALT_EXIT_CODE);
                            shutdown.trigger();
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "loop detector check failed"),
                    }
                }
            }
        }
        info!("loop detector stopped");
    })
}

fn spawn_watchdog_loop<S: vc_store::TrackerStore + 'static>(
    watchdog: Arc<Watchdog<S>>,
    interval: Duration,
    shutdown: Shutdown,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    if let Err(e) = watchdog.check_once().await {
                        warn!(error = %e, "watchdog check failed");
                    }
                }
            }
        }
        info!("watchdog loop stopped");
    })
}

fn spawn_event_cleanup_loop<S: vc_store::TrackerStore + 'static>(
    store: Arc<S>,
    config: Config,
    shutdown: Shutdown,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.event_cleanup_interval);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    let now = chrono::Utc::now();
                    if let Err(e) = store.cleanup_events_by_age(to_chrono(config.event_max_age), to_chrono(config.event_max_age_critical), now).await {
                        warn!(error = %e, "event age cleanup failed");
                    }
                    if let Err(e) = store.cleanup_events_per_issue(config.event_max_per_issue).await {
                        warn!(error = %e, "per-issue event cleanup failed");
                    }
                    if let Err(e) = store.cleanup_events_global(config.event_max_global).await {
                        warn!(error = %e, "global event cleanup failed");
                    }
                    if let Err(e) = store.vacuum().await {
                        warn!(error = %e, "event store vacuum failed");
                    }
                }
            }
        }
        info!("event cleanup loop stopped");
    })
}
