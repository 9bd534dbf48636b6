// SPDX-License-Identifier: MIT

//! Quality-gate execution (§4.4, §4.5, §4.6): a shell command run under a
//! timeout, exit code and stderr mapped to a pass/fail result.

use crate::subprocess::{run_with_timeout, GATE_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use vc_core::GateResult;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("gate execution error: {0}")]
    Execution(String),
}

/// One configured gate: a name and the shell command that implements it.
/// The gate set itself (`test`, `lint`, `build`, ...) is a configuration
/// concern (§9) — this type is the unit of that configuration.
#[derive(Debug, Clone)]
pub struct GateSpec {
    pub name: String,
    pub command: String,
}

impl GateSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }

    /// The standard `test`, `lint`, `build` set (§4.4).
    pub fn standard_set() -> Vec<GateSpec> {
        vec![
            GateSpec::new("test", "cargo test --workspace"),
            GateSpec::new("lint", "cargo clippy --workspace -- -D warnings"),
            GateSpec::new("build", "cargo build --workspace"),
        ]
    }
}

/// A `GateProvider` runs a set of quality gates against a working directory
/// and returns a per-gate result plus an overall pass/fail (§4.4).
#[async_trait]
pub trait GateProvider: Send + Sync {
    async fn run_all(&self, cwd: &Path) -> Result<(Vec<GateResult>, bool), GateError>;
}

/// Default implementation: each [`GateSpec`] runs as `sh -c <command>` under
/// [`run_with_timeout`].
pub struct ShellGateProvider {
    gates: Vec<GateSpec>,
    timeout: Duration,
}

impl ShellGateProvider {
    pub fn new(gates: Vec<GateSpec>, timeout: Duration) -> Self {
        Self { gates, timeout }
    }

    pub fn standard(timeout: Duration) -> Self {
        Self::new(GateSpec::standard_set(), timeout)
    }
}

#[async_trait]
impl GateProvider for ShellGateProvider {
    async fn run_all(&self, cwd: &Path) -> Result<(Vec<GateResult>, bool), GateError> {
        let mut results = Vec::with_capacity(self.gates.len());
        for gate in &self.gates {
            results.push(run_one_gate(gate, cwd, self.timeout).await);
        }
        let all_passed = results.iter().all(|r| r.passed);
        Ok((results, all_passed))
    }
}

async fn run_one_gate(gate: &GateSpec, cwd: &Path, timeout: Duration) -> GateResult {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(&gate.command).current_dir(cwd);

    match run_with_timeout(cmd, timeout, &gate.name).await {
        Ok(output) if output.status.success() => GateResult {
            gate_name: gate.name.clone(),
            passed: true,
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            error: None,
        },
        Ok(output) => GateResult {
            gate_name: gate.name.clone(),
            passed: false,
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            error: Some(format!(
                "{} Gate Failure (exit {}): {}",
                gate.name,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )),
        },
        Err(e) => GateResult {
            gate_name: gate.name.clone(),
            passed: false,
            output: String::new(),
            error: Some(format!("{} Gate Failure: execution error: {e}", gate.name)),
        },
    }
}

/// A `GateProvider` that never runs real commands — always returns the
/// canned results it was built with; used by engine tests that drive the
/// results processor without a real toolchain.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeGateProvider {
    pub results: Vec<GateResult>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeGateProvider {
    pub fn all_pass(names: &[&str]) -> Self {
        Self {
            results: names
                .iter()
                .map(|n| GateResult {
                    gate_name: n.to_string(),
                    passed: true,
                    output: "ok".into(),
                    error: None,
                })
                .collect(),
        }
    }

    pub fn with_failure(mut self, name: &str, output: impl Into<String>) -> Self {
        for result in &mut self.results {
            if result.gate_name == name {
                result.passed = false;
                result.error = Some(format!("{name} Gate Failure"));
                result.output = output.into();
                return self;
            }
        }
        self.results.push(GateResult {
            gate_name: name.to_string(),
            passed: false,
            output: output.into(),
            error: Some(format!("{name} Gate Failure")),
        });
        self
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl GateProvider for FakeGateProvider {
    async fn run_all(&self, _cwd: &Path) -> Result<(Vec<GateResult>, bool), GateError> {
        let all_passed = self.results.iter().all(|r| r.passed);
        Ok((self.results.clone(), all_passed))
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
