//! CLI module for Toonledger
//!
//! Provides commands:
//! - `quote`: Price a single image generation call
//! - `pricing`: List the configured pricing table
//! - `show`: Display the live cost snapshot of a running pipeline
//! - `simulate`: Replay a sample pipeline session through the tracker

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::load_config;

pub mod pricing;
pub mod quote;
pub mod show;
pub mod simulate;

/// Toonledger cost tracking CLI
#[derive(Parser, Debug)]
#[command(name = "toonledger")]
#[command(about = "Image generation cost tracking for the webtoon pipeline")]
#[command(version)]
pub struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Price a single image generation call
    Quote {
        /// Model identifier, e.g. fal-ai/flux-2-pro
        model: String,
        /// Image width in pixels
        #[arg(long, default_value_t = 1024)]
        width: u32,
        /// Image height in pixels
        #[arg(long, default_value_t = 1024)]
        height: u32,
        /// Price as part of a batch submission
        #[arg(long)]
        batch: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the configured pricing table
    Pricing {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the live cost snapshot
    Show {
        /// Snapshot file (defaults to the configured snapshot path)
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Refresh continuously
        #[arg(long, short)]
        watch: bool,
        /// Refresh interval in seconds for --watch
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
    /// Replay a sample pipeline session and print its cost report
    Simulate {
        /// Session id (generated from the start time when omitted)
        #[arg(long)]
        session_id: Option<String>,
        /// Budget override in USD
        #[arg(long)]
        budget: Option<f64>,
        /// Write an export document to this path
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
        /// Leave individual call records out of the export
        #[arg(long)]
        no_records: bool,
        /// Do not write the live snapshot
        #[arg(long)]
        no_snapshot: bool,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(cli.config.as_deref())?;

    match command {
        Commands::Quote {
            model,
            width,
            height,
            batch,
            json,
        } => quote::run(&config, &model, width, height, batch, json),
        Commands::Pricing { json } => pricing::run(&config, json),
        Commands::Show {
            path,
            json,
            watch,
            interval,
        } => {
            let path = path.unwrap_or_else(|| config.tracker.snapshot_path.clone());
            show::run(&path, json, watch, interval).await
        }
        Commands::Simulate {
            session_id,
            budget,
            export,
            no_records,
            no_snapshot,
        } => {
            let options = simulate::SimulateOptions {
                session_id,
                budget,
                export,
                include_records: !no_records,
                snapshot: !no_snapshot,
            };
            simulate::run(config, options).await
        }
    }
}
