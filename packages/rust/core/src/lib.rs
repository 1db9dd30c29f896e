//! Core pipeline orchestration for Pressline.
//!
//! This crate ties together the task queue, the page generator, rollup
//! synchronization and version control into a single publishing run
//! (`run_pipeline`).

pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod report;

pub use generator::{CliGenerator, GenerationOutput, Generator};
pub use pipeline::{
    Collaborators, ProgressReporter, PublishOutcome, RunOutcome, RunReport, SilentProgress, Stage,
    commit_message, preview_batch, run_pipeline,
};
pub use prompt::build_prompt;
pub use report::{StatusReport, TaskOutcome, evaluate, report_status};
