// SPDX-License-Identifier: MIT

//! Version-control port (§4.4, §4.5): commit hash/branch resolution, commit,
//! and hard reset — shelling out to `git` under `subprocess::run_with_timeout`
//! and surfacing a structured error on failure.

use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use vc_core::CommitHash;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("git execution error: {0}")]
    Execution(String),
}

const VCS_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn resolve_head(&self, cwd: &Path) -> Result<(CommitHash, String), VcsError>;
    /// Stage and commit all changes. `Ok(false)` means there was nothing to
    /// commit (clean working tree) — not an error.
    async fn commit_all(&self, cwd: &Path, message: &str) -> Result<bool, VcsError>;
    /// Hard reset the working tree to `HEAD`, discarding uncommitted changes.
    async fn hard_reset(&self, cwd: &Path) -> Result<(), VcsError>;
    async fn is_clean(&self, cwd: &Path) -> Result<bool, VcsError>;
    /// Remove a mission's sandbox worktree and its branch (§4.7 mission
    /// cleanup). `repo_root` is the primary checkout the worktree was added
    /// from.
    async fn destroy_sandbox(&self, repo_root: &Path, sandbox_path: &Path, branch_name: &str) -> Result<(), VcsError>;
}

pub struct GitVcs;

impl GitVcs {
    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<std::process::Output, VcsError> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(cwd);
        run_with_timeout(cmd, VCS_TIMEOUT, "git").await.map_err(|e| VcsError::Execution(e.to_string()))
    }
}

#[async_trait]
impl VersionControl for GitVcs {
    async fn resolve_head(&self, cwd: &Path) -> Result<(CommitHash, String), VcsError> {
        let hash_out = self.run(cwd, &["rev-parse", "HEAD"]).await?;
        if !hash_out.status.success() {
            return Err(VcsError::CommandFailed("git rev-parse HEAD".into()));
        }
        let hash = String::from_utf8_lossy(&hash_out.stdout).trim().to_string();

        let branch_out = self.run(cwd, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = if branch_out.status.success() {
            String::from_utf8_lossy(&branch_out.stdout).trim().to_string()
        } else {
            "HEAD".to_string()
        };

        Ok((CommitHash::from_str_id(hash), branch))
    }

    async fn commit_all(&self, cwd: &Path, message: &str) -> Result<bool, VcsError> {
        if self.is_clean(cwd).await? {
            return Ok(false);
        }
        self.run(cwd, &["add", "-A"]).await?;
        let out = self.run(cwd, &["commit", "-m", message]).await?;
        if !out.status.success() {
            return Err(VcsError::CommandFailed(format!(
                "git commit: {}",
                String::from_utf8_lossy(&out.stderr)
            )));
        }
        Ok(true)
    }

    async fn hard_reset(&self, cwd: &Path) -> Result<(), VcsError> {
        let out = self.run(cwd, &["reset", "--hard", "HEAD"]).await?;
        if !out.status.success() {
            return Err(VcsError::CommandFailed(format!(
                "git reset --hard: {}",
                String::from_utf8_lossy(&out.stderr)
            )));
        }
        let clean_out = self.run(cwd, &["clean", "-fd"]).await?;
        if !clean_out.status.success() {
            return Err(VcsError::CommandFailed(format!(
                "git clean -fd: {}",
                String::from_utf8_lossy(&clean_out.stderr)
            )));
        }
        Ok(())
    }

    async fn is_clean(&self, cwd: &Path) -> Result<bool, VcsError> {
        let out = self.run(cwd, &["status", "--porcelain"]).await?;
        Ok(out.stdout.is_empty())
    }

    async fn destroy_sandbox(&self, repo_root: &Path, sandbox_path: &Path, branch_name: &str) -> Result<(), VcsError> {
        let sandbox_str = sandbox_path.to_string_lossy();
        self.run(repo_root, &["worktree", "remove", "--force", &sandbox_str]).await?;
        self.run(repo_root, &["branch", "-D", branch_name]).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
