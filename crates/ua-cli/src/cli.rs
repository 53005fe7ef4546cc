//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::import::ImportArgs;
use crate::commands::latency::LatencyArgs;
use crate::commands::serve::ServeArgs;

/// User-behavior analytics backend.
///
/// Collects session and interaction events from client applications and
/// serves usage and inference latency statistics to the dashboard.
#[derive(Debug, Parser)]
#[command(name = "ua", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API until interrupted.
    Serve(ServeArgs),

    /// Compute inference latency statistics from the local database.
    Latency(LatencyArgs),

    /// Import events from a JSONL file or stdin.
    Import(ImportArgs),

    /// Show database location and contents.
    Status,
}
