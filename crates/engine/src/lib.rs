// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! vc-engine: the autonomous execution core (§4). Every worker loop here
//! exposes a single-tick/single-run method (`tick`, `run_once`,
//! `check_once`, `run`) rather than owning its own `tokio::spawn`ed loop —
//! the daemon binary is the one place that wires ticks to tickers and a
//! shared shutdown signal (§5), keeping pure state transitions separate
//! from the process that drives them.

pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gate_worker;
pub mod interrupt_manager;
pub mod oracle;
pub mod preflight;
pub mod results;
pub mod state_machine;
pub mod watchdog;

pub use completion::CompletionEngine;
pub use dispatcher::{Dispatcher, DispatcherConfig, TickOutcome};
pub use error::RuntimeError;
pub use events::EventRecorder;
pub use gate_worker::{GateWorker, GateWorkerOutcome};
pub use interrupt_manager::InterruptManager;
pub use oracle::{AiSupervisor, NoopSupervisor, OracleError};
pub use preflight::{DegradedModeGate, FailureMode, PreflightChecker, PreflightOutcome};
pub use results::GateOutcome;
pub use state_machine::{IssueRunner, RunOutcome, RunnerConfig};
pub use watchdog::{Intervention, LoopCheckOutcome, LoopDetector, LoopDetectorConfig, Watchdog, WatchdogConfig, LOOP_HALT_EXIT_CODE};
