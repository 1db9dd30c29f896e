//! Version-control ports and the git CLI adapter.
//!
//! [`VersionControl`] covers the publish side (status, pull, commit, push);
//! [`HistorySource`] answers "when was this path last touched / first added"
//! for content ordering. [`GitCli`] implements both by shelling out to `git`.

mod git;

use std::path::Path;

use async_trait::async_trait;
use pressline_shared::Result;

pub use git::GitCli;

/// Working-tree and remote operations used by the pipeline.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// `git status --porcelain` output; empty means clean.
    async fn status_porcelain(&self) -> Result<String>;

    /// Name of the checked-out branch.
    async fn current_branch(&self) -> Result<String>;

    /// Rebase local work onto the remote branch.
    async fn pull_rebase(&self) -> Result<()>;

    /// Stage every change, deletions included.
    async fn stage_all(&self) -> Result<()>;

    /// Commit staged changes. Returns `false` when there was nothing to commit.
    async fn commit(&self, message: &str) -> Result<bool>;

    async fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

/// Commit-history timestamps (unix seconds) for a path.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Time of the most recent commit touching `path`.
    async fn last_commit_time(&self, path: &Path) -> Option<i64>;

    /// Time of the commit that added `path`.
    async fn first_added_time(&self, path: &Path) -> Option<i64>;
}

/// A history source with no commits, forcing filesystem fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

#[async_trait]
impl HistorySource for NoHistory {
    async fn last_commit_time(&self, _path: &Path) -> Option<i64> {
        None
    }

    async fn first_added_time(&self, _path: &Path) -> Option<i64> {
        None
    }
}
