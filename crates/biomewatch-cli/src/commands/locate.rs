//! Run the log locator for a single process.

use std::collections::HashSet;

use anyhow::{Context, Result};
use biomewatch_core::logs::{LocatorSettings, scan_log_dirs};
use biomewatch_core::{DetectionConfig, LogLocator, ProcessProvider, SystemProcessProvider};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tracing::debug;

pub fn run(config: &DetectionConfig, pid: u32, start: Option<&str>) -> Result<()> {
    let start_time = match start {
        Some(text) => Some(
            DateTime::parse_from_rfc3339(text)
                .with_context(|| format!("Invalid start time: {}", text))?
                .with_timezone(&Utc),
        ),
        None => lookup_start_time(pid)?,
    };

    match start_time {
        Some(t) => println!("PID {} started {}", pid, t.to_rfc3339()),
        None => println!("PID {}: start time unknown, time matching disabled", pid),
    }

    let locator = LogLocator::new(LocatorSettings::from(config));
    let none = HashSet::new();

    let candidates = scan_log_dirs(&config.log_dirs, &config.log_extension)?;
    println!("{} candidate log(s)", candidates.len());

    match locator.locate(pid, start_time, &candidates, &none) {
        Some(found) => println!(
            "  Primary : {} ({})",
            found.path.display().green(),
            found.describe()
        ),
        None => println!("  Primary : {}", "not found".yellow()),
    }

    if let Some(start_time) = start_time {
        let state_candidates = scan_log_dirs(&config.state_log_dirs, &config.log_extension)?;
        match locator.locate_state_log(start_time, &state_candidates, &none) {
            Some(found) => println!(
                "  State   : {} ({})",
                found.path.display().green(),
                found.describe()
            ),
            None => println!("  State   : {}", "not found".yellow()),
        }
    }

    Ok(())
}

fn lookup_start_time(pid: u32) -> Result<Option<DateTime<Utc>>> {
    let mut provider = SystemProcessProvider::new();
    let processes = provider.find_processes(&|_| true)?;
    let found = processes.into_iter().find(|p| p.pid == pid);
    if found.is_none() {
        debug!("PID {} is not running", pid);
    }
    Ok(found.and_then(|p| p.start_time))
}
