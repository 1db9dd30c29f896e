//! `git` subprocess adapter.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use pressline_shared::{PresslineError, Result};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::{HistorySource, VersionControl};

/// Runs `git` in a working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    program: String,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            program: "git".into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn output(&self, args: &[&str]) -> Result<Output> {
        debug!(args = ?args, "git");
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                PresslineError::Vcs(format!(
                    "failed to spawn {}: {e}. Is git installed?",
                    self.program
                ))
            })
    }

    /// Run and require exit status 0; returns trimmed stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let out = self.output(args).await?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let stdout = String::from_utf8_lossy(&out.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(PresslineError::Vcs(format!(
                "git {} failed ({}): {}",
                args.join(" "),
                out.status,
                detail.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    /// Path as git sees it: relative to the working-tree root.
    fn rel<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    async fn log_times(&self, args: &[&str], path: &Path) -> Option<Vec<i64>> {
        let rel = self.rel(path).to_string_lossy().to_string();
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["--", rel.as_str()]);

        let out = self.run(&full).await.ok()?;
        let times: Vec<i64> = out
            .lines()
            .filter_map(|l| l.trim().parse().ok())
            .collect();
        (!times.is_empty()).then_some(times)
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn status_porcelain(&self) -> Result<String> {
        self.run(&["status", "--porcelain"]).await
    }

    async fn current_branch(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    #[instrument(skip_all)]
    async fn pull_rebase(&self) -> Result<()> {
        self.run(&["pull", "--rebase"]).await.map(drop)
    }

    async fn stage_all(&self) -> Result<()> {
        self.run(&["add", "-A"]).await.map(drop)
    }

    #[instrument(skip_all)]
    async fn commit(&self, message: &str) -> Result<bool> {
        // Exit 0 means the index matches HEAD.
        let diff = self.output(&["diff", "--cached", "--quiet"]).await?;
        if diff.status.success() {
            return Ok(false);
        }
        self.run(&["commit", "-m", message]).await?;
        Ok(true)
    }

    #[instrument(skip_all, fields(remote = %remote, branch = %branch))]
    async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["push", remote, branch]).await.map(drop)
    }
}

#[async_trait]
impl HistorySource for GitCli {
    async fn last_commit_time(&self, path: &Path) -> Option<i64> {
        self.log_times(&["log", "-1", "--format=%ct"], path)
            .await?
            .first()
            .copied()
    }

    async fn first_added_time(&self, path: &Path) -> Option<i64> {
        // Newest first; the oldest add is the creation.
        self.log_times(&["log", "--diff-filter=A", "--format=%ct"], path)
            .await?
            .last()
            .copied()
    }
}
