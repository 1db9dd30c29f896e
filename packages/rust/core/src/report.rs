//! Per-task terminal status and the queue write-back.

use std::path::PathBuf;

use pressline_queue::{CellUpdate, TaskQueue};
use pressline_shared::{Result, RetryPolicy, RunContext, Task, TaskStatus, retry};
use tracing::{info, instrument, warn};

/// Terminal status decided for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub id: String,
    pub content_type: String,
    pub slug: String,
    pub row_number: u32,
    /// Relative path the task had to produce; `None` for an unknown type.
    pub expected: Option<PathBuf>,
    pub status: TaskStatus,
}

/// PUBLISHED iff the task's expected artifact exists on disk, ERROR
/// otherwise (including unknown content types).
pub fn evaluate(tasks: &[Task], ctx: &RunContext) -> Vec<TaskOutcome> {
    tasks
        .iter()
        .map(|task| {
            let expected = ctx.site.site.expected_artifact(&task.content_type, &task.slug);
            let exists = expected
                .as_ref()
                .is_some_and(|rel| ctx.root().join(rel).is_file());
            let status = if exists {
                TaskStatus::Published
            } else {
                TaskStatus::Error
            };

            info!(
                id = %task.id,
                slug = %task.slug,
                expected = %expected
                    .as_ref()
                    .map_or_else(|| "unknown path".to_string(), |p| p.display().to_string()),
                %status,
                "task outcome"
            );

            TaskOutcome {
                id: task.id.clone(),
                content_type: task.content_type.clone(),
                slug: task.slug.clone(),
                row_number: task.row_number,
                expected,
                status,
            }
        })
        .collect()
}

/// How the status write-back went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    Written { published: usize, errored: usize },
    Failed(String),
}

impl StatusReport {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

impl std::fmt::Display for StatusReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Written { published, errored } => {
                write!(f, "written ({published} published, {errored} error)")
            }
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Write every outcome's status in one batch update. Never fails: a
/// write-back error is logged and returned as [`StatusReport::Failed`].
#[instrument(skip_all, fields(tasks = outcomes.len()))]
pub async fn report_status(
    queue: &dyn TaskQueue,
    policy: &RetryPolicy,
    status_column: usize,
    outcomes: &[TaskOutcome],
) -> StatusReport {
    let updates: Vec<CellUpdate> = outcomes
        .iter()
        .map(|o| CellUpdate {
            row: o.row_number,
            column: status_column,
            value: o.status.to_string(),
        })
        .collect();

    match write_back(queue, policy, &updates).await {
        Ok(()) => {
            let published = outcomes
                .iter()
                .filter(|o| o.status == TaskStatus::Published)
                .count();
            let report = StatusReport::Written {
                published,
                errored: outcomes.len() - published,
            };
            info!(%report, "queue statuses updated");
            report
        }
        Err(e) => {
            warn!(error = %e, "status write-back failed");
            StatusReport::Failed(e.to_string())
        }
    }
}

async fn write_back(queue: &dyn TaskQueue, policy: &RetryPolicy, updates: &[CellUpdate]) -> Result<()> {
    retry(policy, "status write-back", || queue.write_cells(updates)).await
}
