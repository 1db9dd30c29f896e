//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use pressline_core::{
    CliGenerator, Collaborators, ProgressReporter, PublishOutcome, RunOutcome, RunReport, Stage,
    TaskOutcome, build_prompt, preview_batch, run_pipeline,
};
use pressline_queue::SheetsQueue;
use pressline_rollup::synchronize;
use pressline_shared::{
    AppConfig, ConfigOverrides, RunContext, SiteContext, TaskStatus, init_config, load_config,
};
use pressline_vcs::GitCli;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Pressline: publish queued pages to a static site.
#[derive(Parser)]
#[command(
    name = "pressline",
    version,
    about = "Generate, index and publish queued pages for a git-hosted static site.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Site root (the git working tree).
    #[arg(long, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Config file (defaults to <root>/pressline.toml, then ~/.pressline/pressline.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline: queue, generate, rollups, publish, report.
    Run {
        #[command(flatten)]
        queue: QueueArgs,

        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Rebuild listings, homepage cards, sitemap and nav links only.
    Sync,

    /// Print today's actionable tasks without changing anything.
    Tasks {
        #[command(flatten)]
        queue: QueueArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Queue connection flags.
#[derive(Args, Debug, Default)]
pub(crate) struct QueueArgs {
    /// Spreadsheet ID of the task queue.
    #[arg(long, env = "SEO_SHEET_ID")]
    pub sheet_id: Option<String>,

    /// Sheet (tab) name.
    #[arg(long, env = "SEO_SHEET_NAME")]
    pub sheet_name: Option<String>,

    /// Service-account JSON key file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,
}

/// Generator flags.
#[derive(Args, Debug, Default)]
pub(crate) struct GeneratorArgs {
    /// Model passed to the generator.
    #[arg(long, env = "CLAUDE_MODEL")]
    pub model: Option<String>,

    /// Turn ceiling for one generator session.
    #[arg(long, env = "CLAUDE_MAX_TURNS")]
    pub max_turns: Option<u32>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write pressline.toml with defaults at the site root.
    Init,
    /// Show resolved configuration.
    Show,
}

fn overrides(queue: &QueueArgs, generator: Option<&GeneratorArgs>) -> ConfigOverrides {
    ConfigOverrides {
        sheet_id: queue.sheet_id.clone(),
        sheet_name: queue.sheet_name.clone(),
        credentials: queue.credentials.clone(),
        model: generator.and_then(|g| g.model.clone()),
        max_turns: generator.and_then(|g| g.max_turns),
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

const CRATES: [&str; 7] = [
    "pressline_cli",
    "pressline_core",
    "pressline_shared",
    "pressline_queue",
    "pressline_vcs",
    "pressline_content",
    "pressline_rollup",
];

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let root = site_root(&cli.root)?;
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Run { queue, generator } => {
            cmd_run(&root, config_path, &overrides(&queue, Some(&generator))).await
        }
        Command::Sync => cmd_sync(&root, config_path).await,
        Command::Tasks { queue } => cmd_tasks(&root, config_path, &overrides(&queue, None)).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&root).await,
            ConfigAction::Show => cmd_config_show(&root, config_path).await,
        },
    }
}

fn site_root(root: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(root)
        .map_err(|e| eyre!("cannot open site root '{}': {e}", root.display()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn resolve(root: &Path, config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<RunContext> {
    let mut config = load_config(root, config_path)?;
    config.apply_overrides(overrides);
    Ok(RunContext::resolve(&config, root, today())?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(root: &Path, config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<()> {
    let ctx = resolve(root, config_path, overrides)?;

    let queue = SheetsQueue::from_settings(&ctx.queue)?;
    let git = GitCli::new(ctx.root());
    let generator = CliGenerator::new(ctx.generator.clone(), ctx.root(), build_prompt(&ctx)?);

    info!(
        sheet = %ctx.queue.sheet_name,
        model = %ctx.generator.model,
        max_turns = ctx.generator.max_turns,
        "starting run"
    );

    let deps = Collaborators {
        queue: &queue,
        vcs: &git,
        history: &git,
        generator: &generator,
    };

    let reporter = CliProgress::new();
    let result = run_pipeline(&ctx, &deps, &reporter).await;
    reporter.finish();

    match result? {
        RunOutcome::NothingToDo => {
            println!("Nothing to do: no READY tasks due on {}.", ctx.site.today_str());
        }
        RunOutcome::Completed(report) => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    let publish = match report.publish {
        PublishOutcome::NoChanges => "no changes".to_string(),
        PublishOutcome::Committed { pushed: true } => "committed and pushed".to_string(),
        PublishOutcome::Committed { pushed: false } => "committed, push failed".to_string(),
    };
    let sync = match &report.sync {
        Some(sync) => format!("{} item(s)", sync.items),
        None => "failed".to_string(),
    };

    println!();
    println!("  Run {} complete", report.today);
    println!("  Tasks:   {}", report.outcomes.len());
    for outcome in &report.outcomes {
        println!("    {} [{}] {}", outcome.status, outcome.content_type, outcome.slug);
    }
    println!("  Rollups: {sync}");
    println!("  Publish: {publish}");
    println!("  Queue:   {}", report.status);
    println!("  Time:    {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

async fn cmd_sync(root: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(root, config_path)?;
    let site = SiteContext::new(&config, root, today())?;
    let git = GitCli::new(root);

    let report = synchronize(&site, &git).await?;

    println!();
    println!("  Rollups synchronized");
    println!("  Items:     {}", report.items);
    println!("  Index:     {}", if report.index_updated { "updated" } else { "unchanged" });
    println!("  Homepage:  {}", if report.home_updated { "updated" } else { "unchanged" });
    println!("  Sitemap:   {}", if report.sitemap_written { "written" } else { "unchanged" });
    println!("  Nav files: {}", report.nav_files_changed);
    println!();
    Ok(())
}

async fn cmd_tasks(root: &Path, config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<()> {
    let ctx = resolve(root, config_path, overrides)?;
    let queue = SheetsQueue::from_settings(&ctx.queue)?;

    let batch = preview_batch(&ctx, &queue).await?;
    if batch.is_empty() {
        println!("No READY tasks due on {}.", batch.today);
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}

async fn cmd_config_init(root: &Path) -> Result<()> {
    let path = init_config(root)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(root: &Path, config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(root, config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        self.spinner.set_message(stage.to_string());
    }

    fn task_outcome(&self, outcome: &TaskOutcome) {
        let mark = if outcome.status == TaskStatus::Published { "✓" } else { "✗" };
        self.spinner
            .println(format!("  {mark} [{}] {}", outcome.content_type, outcome.slug));
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.spinner.finish_and_clear();
    }
}
