//! Pressline CLI: scheduled content publishing for static sites.
//!
//! Reads due tasks from a spreadsheet queue, has a headless generator write
//! the pages, refreshes listings and the sitemap, publishes through git,
//! and reports each task's status back to the queue.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
