//! kgbias CLI
//!
//! Centrality-bias analysis of link-prediction errors:
//! - `predict`: rank top-K alternatives for every test triple and save them
//! - `compare`: build original/augmented graphs, run PageRank, emit the tagged log
//! - `parse`: re-aggregate archived logs and compare models
//! - `run`: predict + compare for each model, then parse all logs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod compare;
mod config;
mod parse;
mod predict;
mod run;

use config::RunConfig;

#[derive(Parser)]
#[command(name = "kgbias")]
#[command(
    author,
    version,
    about = "kgbias: are a link predictor's mistakes biased toward central entities?"
)]
struct Cli {
    /// Run configuration (default: $KGBIAS_CONFIG, then ./kgbias.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank top-K alternatives for every test triple and write the prediction set.
    Predict {
        /// Model name from the config's `models` table
        model: String,
    },

    /// Compare centrality of true vs. predicted entities on the original and augmented graphs.
    Compare {
        /// Model name from the config's `models` table
        model: String,
        /// Write the tagged log here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Re-aggregate one or more `compare` logs and rank the models.
    Parse {
        /// Log files written by `compare`
        #[arg(required = true)]
        logs: Vec<PathBuf>,
        /// Output format: text|json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Predict and compare each model (default: all configured), then parse the logs.
    Run {
        /// Model names (default: every configured model)
        models: Vec<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kgbias=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli_path: Option<&PathBuf>) -> Result<RunConfig> {
    let path = config::locate(cli_path.map(PathBuf::as_path));
    let config = RunConfig::load(&path)?;
    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure the rayon thread pool")?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Predict { model } => {
            let config = load_config(cli.config.as_ref())?;
            predict::cmd_predict(&config, model)?;
        }
        Commands::Compare { model, out } => {
            let config = load_config(cli.config.as_ref())?;
            compare::cmd_compare(&config, model, out.as_deref())?;
        }
        Commands::Parse { logs, format } => {
            parse::cmd_parse(logs, format)?;
        }
        Commands::Run { models } => {
            let config = load_config(cli.config.as_ref())?;
            run::cmd_run(&config, models)?;
        }
    }

    Ok(())
}
