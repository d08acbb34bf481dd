//! CLI argument definitions for biomewatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "biomewatch")]
#[command(about = "Multi-instance game client log watcher", version)]
pub struct Args {
    /// Path to config file (TOML)
    #[arg(short, long, value_name = "FILE", default_value = "biomewatch.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Track running clients and print events (default)
    Watch {
        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },
    /// Classify free text as a biome
    Classify {
        /// Text to classify, e.g. "SAND STORM"
        text: String,
    },
    /// List known biomes
    Biomes,
    /// Extract state, aura, events and username from a log file
    Scan {
        /// Log file to read
        file: PathBuf,
        /// Most recent lines to inspect (default: from config)
        #[arg(long)]
        lines: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find the log file a process writes
    Locate {
        /// Process ID
        #[arg(long)]
        pid: u32,
        /// Process start time (RFC 3339); looked up from the OS when omitted
        #[arg(long)]
        start: Option<String>,
    },
}
