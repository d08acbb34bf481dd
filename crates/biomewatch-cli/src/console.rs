//! Console output formatting with colored display

use biomewatch_core::{BiomeMetadata, BiomeTable, EngineEvent, TrackedInstance, TransientHit};
use chrono::Local;
use owo_colors::OwoColorize;

/// Biome name in its table color
pub fn colored_biome(meta: &BiomeMetadata) -> String {
    match meta.rgb() {
        Some((r, g, b)) => meta.display_name.truecolor(r, g, b).bold().to_string(),
        None => meta.display_name.bold().to_string(),
    }
}

/// Two-character color block for biome listings
pub fn swatch(meta: &BiomeMetadata) -> String {
    match meta.rgb() {
        Some((r, g, b)) => "  ".on_truecolor(r, g, b).to_string(),
        None => "  ".to_string(),
    }
}

fn who(instance: &TrackedInstance) -> String {
    format!("{} [{}]", instance.display_name.bold(), instance.pid)
}

fn describe_hit(hit: &TransientHit) -> String {
    let mut text = format!("{} ({})", hit.kind.to_string().magenta().bold(), hit.tier);
    if let Some(detail) = &hit.detail {
        text.push_str(&format!(" {} in {}", detail.name, detail.location));
    }
    text
}

/// One console line for an engine event
pub fn format_event(event: &EngineEvent, table: &BiomeTable) -> String {
    let time = Local::now().format("%H:%M:%S").to_string();
    let body = match event {
        EngineEvent::InstanceAdded(i) => format!("{} {}", "+".green(), who(i)),
        EngineEvent::InstanceRemoved(i) => format!("{} {}", "-".red(), who(i)),
        EngineEvent::StateChanged(i) => {
            format!("{} biome {}", who(i), colored_biome(table.metadata(i.biome)))
        }
        EngineEvent::AuraChanged(i) => format!(
            "{} aura {}",
            who(i),
            i.aura.as_deref().unwrap_or("-").cyan()
        ),
        EngineEvent::UsernameResolved(i) => {
            format!("PID {} is {}", i.pid, i.display_name.bold())
        }
        EngineEvent::TransientEventFired { instance, event } => {
            format!("{} {}", who(instance), describe_hit(event))
        }
        EngineEvent::Status(message) => message.dimmed().to_string(),
        EngineEvent::Error(message) => message.red().to_string(),
    };
    format!("{} {}", time.dimmed(), body)
}
