//! Sieve: resumable receptor/ligand docking campaigns.
//! Entry point for the `sieve` binary.

mod config;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sieve_common::RunConfig;
use sieve_docking::pipeline::{Pipeline, StageContext, StageResults};
use sieve_docking::stages;
use sieve_docking::tools::{SharedRunner, SystemCommandRunner};

#[derive(Parser)]
#[command(name = "sieve", version)]
#[command(about = "Resumable receptor/ligand docking campaigns", long_about = None)]
struct Cli {
    /// Config TOML file (defaults to ./sieve.toml when present)
    #[arg(short, long, global = true, env = "SIEVE_CONFIG")]
    config: Option<PathBuf>,

    /// Print a JSON summary of every base path to stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the configured stages over every base path
    Dock {
        /// Base directories (replace `layout.base_paths`)
        base: Vec<PathBuf>,

        /// Stage list, comma-separated (replaces `stages`)
        #[arg(long, value_delimiter = ',')]
        stages: Vec<String>,

        /// Dock complexes concurrently
        #[arg(long)]
        multiprocess: bool,

        /// Concurrent docking tasks
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Rescore docked poses and merge model scores into the score table
    Rescore {
        /// Base directories (replace `layout.base_paths`)
        base: Vec<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct BaseSummary {
    base: PathBuf,
    started_at: DateTime<Utc>,
    ok: bool,
    stages: StageResults,
}

async fn run_base(command: &Command, config: &Arc<RunConfig>, base: PathBuf, runner: SharedRunner) -> BaseSummary {
    let started_at = Utc::now();
    let t0 = Instant::now();
    info!(base = %base.display(), "Processing base path");

    let outcome = match command {
        Command::Dock { .. } => Pipeline::new(config.clone(), &base, runner).run().await,
        Command::Rescore { .. } => {
            let ctx = StageContext::new(config.clone(), &base, runner);
            stages::rescore(&ctx).await.map(|report| {
                let mut results = StageResults::new();
                results.insert(report.stage.clone(), Some(report));
                results
            })
        }
    };

    match outcome {
        Ok(stages) => {
            info!(base = %base.display(), took = ?t0.elapsed(), "Base path finished");
            BaseSummary { base, started_at, ok: true, stages }
        }
        Err(e) => {
            error!(base = %base.display(), error = %e, "Base path failed");
            BaseSummary { base, started_at, ok: false, stages: StageResults::new() }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sieve=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Sieve {} starting up", env!("CARGO_PKG_VERSION"));

    let mut config = config::load(cli.config.as_deref())?;
    let overrides = match &cli.command {
        Command::Dock { base, stages, multiprocess, workers } => config::Overrides {
            base_paths: base.clone(),
            stages: stages.clone(),
            multiprocess: *multiprocess,
            workers: *workers,
        },
        Command::Rescore { base } => config::Overrides {
            base_paths: base.clone(),
            ..Default::default()
        },
    };
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    if matches!(cli.command, Command::Rescore { .. }) && !config.rescoring.enabled {
        warn!("rescoring.enabled is false; running rescoring because it was requested explicitly");
    }

    let config = Arc::new(config);
    let runner: SharedRunner = Arc::new(SystemCommandRunner);

    let mut summaries = Vec::with_capacity(config.layout.base_paths.len());
    for base in config.layout.base_paths.clone() {
        summaries.push(run_base(&cli.command, &config, base, runner.clone()).await);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    let failed = summaries.iter().filter(|s| !s.ok).count();
    if failed > 0 {
        anyhow::bail!("{} of {} base paths failed", failed, summaries.len());
    }
    info!("Sieve finished.");
    Ok(())
}
