//! League Bot
//!
//! A Fairylab bot with two plugins:
//!
//! - `scoreboard`: records runs typed as `Scoreboard.record(Team,runs)` in
//!   the testing channel, persists them and renders a page.
//! - `digest`: receives the totals as a shadow and posts the leader each
//!   morning.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package league-bot -- --config demos/league_bot/fairylab.toml
//! cargo run --package league-bot -- --once --golden
//! ```

mod plugins;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fairylab::prelude::*;
use fairylab::runtime::RuntimeBuilder;

#[derive(Debug, Parser)]
#[command(name = "league-bot", version, about = "Fairylab league bot")]
struct Cli {
    /// Configuration file (defaults to searching for fairylab.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long)]
    profile: Option<String>,

    /// Render into the golden root instead of the live HTML root.
    #[arg(long)]
    golden: bool,

    /// Set up, tick once, drain the task queue once, then exit.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn builder(&self) -> RuntimeBuilder {
        let mut builder = FairylabRuntime::builder(plugins::catalog());
        if let Some(path) = &self.config {
            builder = builder.config_file(path);
        }
        if let Some(profile) = &self.profile {
            builder = builder.profile(profile.clone());
        }
        if self.golden {
            builder = builder.render_mode(RenderMode::Golden);
        }
        builder
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = cli.builder().build().context("failed to start runtime")?;

    if cli.once {
        runtime.run_once().await?;
        for status in runtime.status().await? {
            info!(
                plugin = %status.name,
                ok = status.ok,
                date = %status.date.format("%Y-%m-%d %H:%M:%S"),
                "Plugin status"
            );
        }
        return Ok(());
    }

    match runtime.run().await? {
        RunOutcome::Shutdown => Ok(()),
        RunOutcome::Reboot => Err(restart_process()).context("failed to restart"),
    }
}
