mod cli;
mod commands;
mod console;

use anyhow::Result;
use biomewatch_core::DetectionConfig;
use clap::Parser;
use cli::{Args, Command};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("biomewatch=info,biomewatch_core=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = DetectionConfig::load_or_default(&args.config);
    if args.config.exists() {
        info!("Loaded config from {}", args.config.display());
    }

    match args.command {
        None => commands::watch::run(config, false).await,
        Some(Command::Watch { json }) => commands::watch::run(config, json).await,
        Some(Command::Classify { text }) => commands::classify::run(&text),
        Some(Command::Biomes) => commands::biomes::run(),
        Some(Command::Scan { file, lines, json }) => commands::scan::run(&config, &file, lines, json),
        Some(Command::Locate { pid, start }) => commands::locate::run(&config, pid, start.as_deref()),
    }
}
