//! End-to-end publishing run: clean check → queue → batch → generate →
//! rollups → publish → status report.
//!
//! Once the batch file is on disk the status report always runs, whatever
//! happens in between. A failed generate or publish is surfaced as
//! [`PresslineError::Stage`] carrying the write-back outcome.

use std::time::{Duration, Instant};

use pressline_queue::{TaskQueue, fetch_actionable_tasks};
use pressline_rollup::{SyncReport, synchronize};
use pressline_shared::{
    PresslineError, Result, RunContext, TaskBatch, check_forbidden_env, retry, write_atomic,
};
use pressline_vcs::{HistorySource, VersionControl};
use tracing::{info, instrument, warn};

use crate::generator::{GenerationOutput, Generator};
use crate::report::{StatusReport, TaskOutcome, evaluate, report_status};

// ---------------------------------------------------------------------------
// Stages and results
// ---------------------------------------------------------------------------

/// Pipeline states, in order. `Aborted` is reachable before `Generate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CleanCheck,
    FetchQueue,
    BuildBatch,
    Generate,
    SyncRollups,
    Publish,
    ReportStatus,
    Done,
    Aborted,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CleanCheck => "clean check",
            Self::FetchQueue => "fetch queue",
            Self::BuildBatch => "build batch",
            Self::Generate => "generate",
            Self::SyncRollups => "sync rollups",
            Self::Publish => "publish",
            Self::ReportStatus => "report status",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the publish stage did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The working tree had nothing to commit.
    NoChanges,
    Committed { pushed: bool },
}

/// Summary of a run that reached the status report.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub today: String,
    pub generation: GenerationOutput,
    /// `None` when synchronization failed (degraded).
    pub sync: Option<SyncReport>,
    pub publish: PublishOutcome,
    pub outcomes: Vec<TaskOutcome>,
    pub status: StatusReport,
    pub elapsed: Duration,
}

/// How a run ended successfully.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// No actionable tasks; no side effects beyond the clean check and pull.
    NothingToDo,
    Completed(RunReport),
}

/// External collaborators of a run.
pub struct Collaborators<'a> {
    pub queue: &'a dyn TaskQueue,
    pub vcs: &'a dyn VersionControl,
    pub history: &'a dyn HistorySource,
    pub generator: &'a dyn Generator,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a stage.
    fn stage(&self, stage: Stage);
    /// Called once per task when its terminal status is decided.
    fn task_outcome(&self, outcome: &TaskOutcome);
    /// Called when the run ends without a fatal error.
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn task_outcome(&self, _outcome: &TaskOutcome) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run the full publishing pipeline once.
#[instrument(skip_all, fields(root = %ctx.root().display(), today = %ctx.today()))]
pub async fn run_pipeline(
    ctx: &RunContext,
    deps: &Collaborators<'_>,
    progress: &dyn ProgressReporter,
) -> Result<RunOutcome> {
    let start = Instant::now();
    info!("starting publishing run");

    // --- Clean check ---
    progress.stage(Stage::CleanCheck);
    if let Err(e) = clean_check(ctx, deps.vcs).await {
        progress.stage(Stage::Aborted);
        return Err(e);
    }

    // --- Fetch queue / build batch ---
    progress.stage(Stage::FetchQueue);
    let snapshot = match fetch_actionable_tasks(deps.queue, &ctx.retry, ctx.today()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            progress.stage(Stage::Aborted);
            return Err(e);
        }
    };

    progress.stage(Stage::BuildBatch);
    if snapshot.tasks.is_empty() {
        info!(today = %ctx.today(), "no READY tasks due, nothing to do");
        let outcome = RunOutcome::NothingToDo;
        progress.stage(Stage::Done);
        progress.done(&outcome);
        return Ok(outcome);
    }

    let batch = TaskBatch::new(ctx.today(), snapshot.tasks);
    if let Err(e) = write_batch(ctx, &batch) {
        progress.stage(Stage::Aborted);
        return Err(e);
    }

    // --- Generate / sync / publish, then always report ---
    let phase = generate_sync_publish(ctx, deps, &batch, progress).await;

    progress.stage(Stage::ReportStatus);
    let outcomes = evaluate(&batch.tasks, ctx);
    for outcome in &outcomes {
        progress.task_outcome(outcome);
    }
    let status = report_status(deps.queue, &ctx.retry, snapshot.status_column, &outcomes).await;

    match phase {
        Ok((generation, sync, publish)) => {
            let outcome = RunOutcome::Completed(RunReport {
                today: batch.today.clone(),
                generation,
                sync,
                publish,
                outcomes,
                status,
                elapsed: start.elapsed(),
            });
            info!(tasks = batch.len(), elapsed_ms = start.elapsed().as_millis() as u64, "run complete");
            progress.stage(Stage::Done);
            progress.done(&outcome);
            Ok(outcome)
        }
        Err((stage, e)) => {
            warn!(%stage, error = %e, status_report = %status, "run failed");
            Err(PresslineError::Stage {
                stage: stage.to_string(),
                message: e.to_string(),
                status_report: status.to_string(),
            })
        }
    }
}

/// Clean tree, publishing branch, no forbidden environment, then pull.
#[instrument(skip_all)]
async fn clean_check(ctx: &RunContext, vcs: &dyn VersionControl) -> Result<()> {
    check_forbidden_env(&ctx.generator)?;

    let dirty = vcs.status_porcelain().await?;
    if !dirty.trim().is_empty() {
        return Err(PresslineError::Precondition(format!(
            "working tree is not clean. Commit or stash your changes first.\n{dirty}"
        )));
    }

    let branch = vcs.current_branch().await?;
    if branch != ctx.publish.branch {
        return Err(PresslineError::Precondition(format!(
            "on branch '{branch}', expected '{}'",
            ctx.publish.branch
        )));
    }

    if let Err(e) = retry(&ctx.retry, "git pull", || vcs.pull_rebase()).await {
        warn!(error = %e, "could not pull, continuing with local state");
    }
    Ok(())
}

fn write_batch(ctx: &RunContext, batch: &TaskBatch) -> Result<()> {
    let json = serde_json::to_string_pretty(batch)
        .map_err(|e| PresslineError::validation(format!("failed to serialize batch: {e}")))?;
    let path = ctx.batch_path();
    write_atomic(&path, json.as_bytes())?;

    info!(path = %path.display(), tasks = batch.len(), "task batch written");
    for task in &batch.tasks {
        info!(
            "  - [{}] {}: {}",
            task.content_type, task.slug, task.title
        );
    }
    Ok(())
}

type PhaseResult = std::result::Result<
    (GenerationOutput, Option<SyncReport>, PublishOutcome),
    (Stage, PresslineError),
>;

async fn generate_sync_publish(
    ctx: &RunContext,
    deps: &Collaborators<'_>,
    batch: &TaskBatch,
    progress: &dyn ProgressReporter,
) -> PhaseResult {
    progress.stage(Stage::Generate);
    let generation = retry(&ctx.retry, "generate", || deps.generator.generate(batch))
        .await
        .map_err(|e| (Stage::Generate, e))?;
    info!(elapsed_ms = generation.elapsed.as_millis() as u64, "generation finished");

    progress.stage(Stage::SyncRollups);
    let sync = match synchronize(&ctx.site, deps.history).await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(error = %e, "rollup synchronization failed, publishing without it");
            None
        }
    };

    progress.stage(Stage::Publish);
    let publish = publish(ctx, deps.vcs, batch)
        .await
        .map_err(|e| (Stage::Publish, e))?;

    Ok((generation, sync, publish))
}

/// `seo: publish N page(s) - YYYY-MM-DD` plus one `- [type] slug` per task.
pub fn commit_message(batch: &TaskBatch) -> String {
    let mut msg = format!("seo: publish {} page(s) - {}\n", batch.len(), batch.today);
    for task in &batch.tasks {
        msg.push_str(&format!("\n- [{}] {}", task.content_type, task.slug));
    }
    msg
}

#[instrument(skip_all)]
async fn publish(
    ctx: &RunContext,
    vcs: &dyn VersionControl,
    batch: &TaskBatch,
) -> Result<PublishOutcome> {
    let changes = vcs.status_porcelain().await?;
    if changes.trim().is_empty() {
        info!("no files changed, nothing to commit");
        return Ok(PublishOutcome::NoChanges);
    }
    info!("changes detected:\n{}", changes.trim_end());

    vcs.stage_all().await?;
    if !vcs.commit(&commit_message(batch)).await? {
        info!("nothing staged, nothing to commit");
        return Ok(PublishOutcome::NoChanges);
    }
    info!("changes committed");

    let (remote, branch) = (&ctx.publish.remote, &ctx.publish.branch);
    let pushed = match retry(&ctx.retry, "git push", || vcs.push(remote, branch)).await {
        Ok(()) => {
            info!(%remote, %branch, "pushed");
            true
        }
        Err(e) => {
            warn!(error = %e, "push failed. Push manually");
            false
        }
    };

    Ok(PublishOutcome::Committed { pushed })
}

/// Read the queue and return today's batch without side effects.
pub async fn preview_batch(ctx: &RunContext, queue: &dyn TaskQueue) -> Result<TaskBatch> {
    let snapshot = fetch_actionable_tasks(queue, &ctx.retry, ctx.today()).await?;
    Ok(TaskBatch::new(ctx.today(), snapshot.tasks))
}
