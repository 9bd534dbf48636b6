// SPDX-License-Identifier: MIT

//! Environment-driven configuration (§6.4). Every `VC_*` variable named in
//! this system's external-interfaces table, plus the additions a runnable
//! daemon needs (state directory, agent variant, gate commands, loop
//! cadences) — failing fast with [`ConfigError`] on an invalid value.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use vc_engine::FailureMode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("could not determine a state directory (set VC_STATE_DIR or $HOME)")]
    NoStateDir,
}

/// Parse `"30s"`, `"5m"`, `"2h"`, `"7d"` into a [`Duration`]. No external
/// duration-parsing crate — the suffix grammar needed here is small enough
/// not to warrant one.
fn parse_duration(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let bad = || ConfigError::InvalidValue { name, value: raw.to_string() };
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(bad());
    }
    let (digits, suffix) = raw.split_at(raw.len() - 1);
    let (digits, multiplier) = match suffix {
        "s" => (digits, 1u64),
        "m" => (digits, 60),
        "h" => (digits, 60 * 60),
        "d" => (digits, 60 * 60 * 24),
        _ => (raw, 1), // bare number of seconds
    };
    let n: u64 = digits.parse().map_err(|_| bad())?;
    if n == 0 && multiplier != 1 {
        return Err(bad());
    }
    Ok(Duration::from_secs(n * multiplier))
}

fn env_duration(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => parse_duration(name, &raw),
        Err(_) => Ok(default),
    }
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidValue { name, value: other.to_string() }),
        },
        Err(_) => Ok(default),
    }
}

fn env_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => {
            let value: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue { name, value: raw.clone() })?;
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue { name, value: raw });
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}

fn env_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn env_string(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn failure_mode(raw: &str) -> Result<FailureMode, ConfigError> {
    match raw {
        "block" => Ok(FailureMode::Block),
        "warn" => Ok(FailureMode::Warn),
        "ignore" => Ok(FailureMode::Ignore),
        other => Err(ConfigError::InvalidValue {
            name: "VC_PREFLIGHT_FAILURE_MODE",
            value: other.to_string(),
        }),
    }
}

/// Which named coding-agent variant to spawn (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentVariant {
    ClaudeCode,
    Amp,
}

#[derive(Debug, Clone)]
pub struct Config {
    // -- Paths --
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub wal_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub log_path: PathBuf,
    pub repo_path: PathBuf,

    // -- §6.4 pre-flight --
    pub preflight_enabled: bool,
    pub preflight_cache_ttl: Duration,
    pub preflight_failure_mode: FailureMode,
    pub preflight_gates_timeout: Duration,

    // -- §6.4 loop detector --
    pub loop_detector_enabled: bool,
    pub loop_detector_check_interval: Duration,
    pub loop_detector_lookback_window: Duration,
    pub loop_detector_min_confidence: f64,

    // -- Watchdog (same shape as the loop detector, §4.8) --
    pub watchdog_enabled: bool,
    pub watchdog_check_interval: Duration,
    pub watchdog_lookback_window: Duration,
    pub watchdog_escalate_threshold: f64,
    pub watchdog_issue_threshold: f64,

    // -- Dispatcher & lease manager (§4.1, §5) --
    pub dispatch_interval: Duration,
    pub stale_threshold: Duration,
    pub stale_sweep_interval: Duration,
    pub stopped_instance_age: Duration,
    pub keep_recent_instances: usize,

    // -- Gate lane (§4.6) --
    pub gate_worker_interval: Duration,

    // -- Agent supervisor (§4.3) --
    pub agent_variant: AgentVariant,
    pub agent_binary: String,
    pub agent_timeout: Duration,
    pub agent_streaming_json: bool,

    // -- Results processor (§4.4) --
    pub auto_commit: bool,
    pub commit_message_template: String,

    // -- Event retention (§3, §9) --
    pub event_max_age: Duration,
    pub event_max_age_critical: Duration,
    pub event_max_per_issue: usize,
    pub event_max_global: usize,
    pub event_cleanup_interval: Duration,

    pub version: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = match std::env::var("VC_STATE_DIR") {
            Ok(raw) => PathBuf::from(raw),
            Err(_) => dirs::state_dir()
                .or_else(dirs::home_dir)
                .map(|p| p.join(".local").join("state").join("vc"))
                .ok_or(ConfigError::NoStateDir)?,
        };

        let agent_variant = match env_string("VC_AGENT_VARIANT", "claude-code").as_str() {
            "claude-code" => AgentVariant::ClaudeCode,
            "amp" => AgentVariant::Amp,
            other => {
                return Err(ConfigError::InvalidValue {
                    name: "VC_AGENT_VARIANT",
                    value: other.to_string(),
                })
            }
        };
        let default_binary = match agent_variant {
            AgentVariant::ClaudeCode => "claude",
            AgentVariant::Amp => "amp",
        };

        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            wal_path: state_dir.join("wal").join("events.wal"),
            snapshot_path: state_dir.join("snapshot.json"),
            log_path: state_dir.join("daemon.log"),
            repo_path: PathBuf::from(env_string("VC_REPO_PATH", ".")),
            state_dir,

            preflight_enabled: env_bool("VC_PREFLIGHT_ENABLED", true)?,
            preflight_cache_ttl: env_duration("VC_PREFLIGHT_CACHE_TTL", Duration::from_secs(5 * 60))?,
            preflight_failure_mode: failure_mode(&env_string("VC_PREFLIGHT_FAILURE_MODE", "block"))?,
            preflight_gates_timeout: env_duration("VC_PREFLIGHT_GATES_TIMEOUT", Duration::from_secs(5 * 60))?,

            loop_detector_enabled: env_bool("VC_LOOP_DETECTOR_ENABLED", true)?,
            loop_detector_check_interval: env_duration("VC_LOOP_DETECTOR_CHECK_INTERVAL", Duration::from_secs(30))?,
            loop_detector_lookback_window: env_duration("VC_LOOP_DETECTOR_LOOKBACK_WINDOW", Duration::from_secs(10 * 60))?,
            loop_detector_min_confidence: env_f64("VC_LOOP_DETECTOR_MIN_CONFIDENCE", 0.8)?,

            watchdog_enabled: env_bool("VC_WATCHDOG_ENABLED", true)?,
            watchdog_check_interval: env_duration("VC_WATCHDOG_CHECK_INTERVAL", Duration::from_secs(30))?,
            watchdog_lookback_window: env_duration("VC_WATCHDOG_LOOKBACK_WINDOW", Duration::from_secs(10 * 60))?,
            watchdog_escalate_threshold: env_f64("VC_WATCHDOG_ESCALATE_THRESHOLD", 0.8)?,
            watchdog_issue_threshold: env_f64("VC_WATCHDOG_ISSUE_THRESHOLD", 0.5)?,

            dispatch_interval: env_duration("VC_DISPATCH_INTERVAL", Duration::from_secs(5))?,
            stale_threshold: env_duration("VC_STALE_THRESHOLD", Duration::from_secs(5 * 60))?,
            stale_sweep_interval: env_duration("VC_STALE_SWEEP_INTERVAL", Duration::from_secs(30))?,
            stopped_instance_age: env_duration("VC_STOPPED_INSTANCE_AGE", Duration::from_secs(24 * 60 * 60))?,
            keep_recent_instances: env_usize("VC_KEEP_RECENT_INSTANCES", 5)?,

            gate_worker_interval: env_duration("VC_GATE_WORKER_INTERVAL", Duration::from_secs(5))?,

            agent_variant,
            agent_binary: env_string("VC_AGENT_BINARY", default_binary),
            agent_timeout: env_duration("VC_AGENT_TIMEOUT", Duration::from_secs(30 * 60))?,
            agent_streaming_json: env_bool("VC_AGENT_STREAMING_JSON", false)?,

            auto_commit: env_bool("VC_AUTO_COMMIT", true)?,
            commit_message_template: env_string("VC_COMMIT_MESSAGE_TEMPLATE", "Close {issue_id}: {title}"),

            event_max_age: env_duration("VC_EVENT_MAX_AGE", Duration::from_secs(7 * 24 * 60 * 60))?,
            event_max_age_critical: env_duration("VC_EVENT_MAX_AGE_CRITICAL", Duration::from_secs(30 * 24 * 60 * 60))?,
            event_max_per_issue: env_usize("VC_EVENT_MAX_PER_ISSUE", 500)?,
            event_max_global: env_usize("VC_EVENT_MAX_GLOBAL", 50_000)?,
            event_cleanup_interval: env_duration("VC_EVENT_CLEANUP_INTERVAL", Duration::from_secs(60 * 60))?,

            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
