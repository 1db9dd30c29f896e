//! Page generator port and the headless CLI implementation.
//!
//! The generator reads the batch file from the working tree and writes
//! artifacts into it. Pressline never inspects how; it only checks which
//! expected files exist afterwards.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pressline_shared::{GeneratorConfig, PresslineError, Result, TaskBatch};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, instrument};

/// Longest stderr excerpt kept in a failure message.
const MAX_STDERR: usize = 2_000;

/// What a successful generation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    /// The generator's own summary (its stdout).
    pub summary: String,
    pub elapsed: Duration,
}

/// Produces artifacts for a task batch.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, batch: &TaskBatch) -> Result<GenerationOutput>;
}

/// Runs a headless coding-agent CLI with the instruction document on stdin.
#[derive(Debug, Clone)]
pub struct CliGenerator {
    config: GeneratorConfig,
    root: PathBuf,
    prompt: String,
}

impl CliGenerator {
    pub fn new(config: GeneratorConfig, root: impl Into<PathBuf>, prompt: String) -> Self {
        Self {
            config,
            root: root.into(),
            prompt,
        }
    }

    /// Arguments passed to the generator executable.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-p".into(),
            "--model".into(),
            self.config.model.clone(),
            "--max-turns".into(),
            self.config.max_turns.to_string(),
            "--permission-mode".into(),
            self.config.permission_mode.clone(),
            "--disallowedTools".into(),
            self.config.disallowed_tools.join(","),
        ]
    }
}

#[async_trait]
impl Generator for CliGenerator {
    #[instrument(skip_all, fields(command = %self.config.command, model = %self.config.model, tasks = batch.len()))]
    async fn generate(&self, batch: &TaskBatch) -> Result<GenerationOutput> {
        let start = Instant::now();
        info!(
            max_turns = self.config.max_turns,
            disallowed = %self.config.disallowed_tools.join(","),
            "running generator"
        );

        let mut child = Command::new(&self.config.command)
            .args(self.args())
            .current_dir(&self.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                let message = format!(
                    "failed to spawn generator: {e}. Is `{}` installed?",
                    self.config.command
                );
                if e.kind() == ErrorKind::NotFound {
                    PresslineError::Precondition(message)
                } else {
                    PresslineError::Generation(message)
                }
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            PresslineError::Generation("failed to capture generator stdin".into())
        })?;
        stdin
            .write_all(self.prompt.as_bytes())
            .await
            .map_err(|e| PresslineError::Generation(format!("failed to write prompt: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PresslineError::Generation(format!("generator wait failed: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .chars()
                .rev()
                .take(MAX_STDERR)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return Err(PresslineError::Generation(format!(
                "{} exited with {}: {}",
                self.config.command,
                output.status,
                tail.trim()
            )));
        }

        info!(
            "--- generator output ---\n{}\n--- end generator output ---",
            stdout.trim_end()
        );

        Ok(GenerationOutput {
            summary: stdout,
            elapsed: start.elapsed(),
        })
    }
}
