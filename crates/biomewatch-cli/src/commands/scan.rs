//! One-shot extraction from a single log file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use biomewatch_core::logs::{read_prefix, read_recent_lines};
use biomewatch_core::{
    BiomeTable, DetectionConfig, StateExtractor, TrackedInstance, resolve_username,
};
use owo_colors::OwoColorize;
use serde_json::json;

use crate::console::colored_biome;

/// Run every extractor over `file` as if it belonged to a fresh instance
pub fn run(config: &DetectionConfig, file: &Path, lines: Option<usize>, json: bool) -> Result<()> {
    if !file.is_file() {
        bail!("Log file not found: {}", file.display());
    }

    let table = Arc::new(BiomeTable::builtin());
    let extractor = StateExtractor::new(Arc::clone(&table));

    let max_lines = lines.unwrap_or(config.tail_lines);
    let recent = read_recent_lines(file, max_lines);
    let instance = TrackedInstance::new(0, "scan", None);
    let result = extractor.extract(&instance, &recent);

    let username = read_prefix(file, config.identity_prefix_bytes)
        .ok()
        .and_then(|content| resolve_username(&content));

    if json {
        let output = json!({
            "file": file,
            "lines_read": recent.len(),
            "username": username,
            "state": result.state,
            "aura": result.aura,
            "events": result.events,
            "newest_timestamp": result.watermark,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} ({} lines)", file.display().bold(), recent.len());
    println!("  Username : {}", username.as_deref().unwrap_or("-"));
    match &result.state {
        Some(state) => println!(
            "  Biome    : {} (from {:?})",
            colored_biome(table.metadata(state.biome)),
            state.source_text
        ),
        None => println!("  Biome    : -"),
    }
    println!("  Aura     : {}", result.aura.as_deref().unwrap_or("-"));

    if result.events.is_empty() {
        println!("  Events   : -");
    }
    for event in &result.events {
        let detail = event
            .detail
            .as_ref()
            .map(|d| format!(" {} in {}", d.name, d.location))
            .unwrap_or_default();
        println!(
            "  Event    : {} at {} ({}){}",
            event.kind.to_string().magenta(),
            event.logged_at.format("%Y-%m-%d %H:%M:%S"),
            event.tier,
            detail
        );
    }
    Ok(())
}
