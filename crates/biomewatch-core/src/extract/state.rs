use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::biome::{BiomeTable, BiomeType};
use crate::instance::TrackedInstance;

use super::events::{TransientHit, TransientKind};
use super::patterns::{RE_AURA, RE_BIOME, RE_LOG_TIMESTAMP, RE_RPC_PAYLOAD};

/// A resolved biome and the text that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateMatch {
    pub biome: BiomeType,
    /// Display name from the classification table
    pub label: String,
    /// Text captured from the log line
    pub source_text: String,
}

/// Changes found in one batch of log lines.
///
/// `state` and `aura` are only set when they differ from the instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub state: Option<StateMatch>,
    pub aura: Option<String>,
    pub events: Vec<TransientHit>,
    /// Newest log timestamp seen, when newer than the instance watermark
    pub watermark: Option<DateTime<Utc>>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.aura.is_none() && self.events.is_empty() && self.watermark.is_none()
    }
}

/// Pulls biome, aura and transient events out of newest-first log lines.
#[derive(Debug, Clone)]
pub struct StateExtractor {
    table: Arc<BiomeTable>,
}

impl StateExtractor {
    pub fn new(table: Arc<BiomeTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &BiomeTable {
        &self.table
    }

    pub fn extract(&self, instance: &TrackedInstance, lines: &[String]) -> ExtractionResult {
        let mut result = ExtractionResult::default();

        if let Some(found) = self.latest_state(lines)
            && found.biome != instance.biome
        {
            result.state = Some(found);
        }

        if let Some(aura) = latest_aura(lines)
            && instance.aura.as_deref() != Some(aura.as_str())
        {
            result.aura = Some(aura);
        }

        // A state change re-arms every event for the lines scanned below
        let armed: HashSet<TransientKind> = if result.state.is_some() {
            TransientKind::iter().collect()
        } else {
            TransientKind::iter()
                .filter(|kind| !instance.has_fired(*kind))
                .collect()
        };

        let (events, watermark) = scan_transients(lines, instance.last_event_time, armed);
        result.events = events;
        result.watermark = watermark;
        result
    }

    /// Newest line that resolves to a known biome.
    ///
    /// The first pattern that matches a line decides that line, even when its
    /// text classifies as unknown.
    pub fn latest_state(&self, lines: &[String]) -> Option<StateMatch> {
        lines.iter().find_map(|line| self.state_from_line(line))
    }

    fn state_from_line(&self, line: &str) -> Option<StateMatch> {
        let text = match RE_BIOME.iter().find_map(|re| re.captures(line)) {
            Some(caps) => caps[1].trim().to_uppercase(),
            None => rpc_biome_text(line)?,
        };

        let biome = self.table.classify(&text);
        if biome.is_unknown() {
            return None;
        }

        Some(StateMatch {
            biome,
            label: self.table.display_name(biome).to_string(),
            source_text: text,
        })
    }
}

/// Newest equipped aura, with `_` separators shown as `: `.
pub fn latest_aura(lines: &[String]) -> Option<String> {
    lines.iter().find_map(|line| {
        RE_AURA
            .iter()
            .find_map(|re| re.captures(line))
            .map(|caps| caps[1].replace('_', ": "))
    })
}

/// Parse the leading `YYYY-MM-DDTHH:MM:SS.mmmZ` timestamp of a log line.
pub fn line_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let caps = RE_LOG_TIMESTAMP.captures(line)?;
    DateTime::parse_from_rfc3339(&caps[1])
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Walk newest-first lines down to the watermark, firing each armed event
/// family at most once.
///
/// Lines without a parseable timestamp are skipped. The walk stops at the
/// first line not strictly newer than `watermark`.
pub fn scan_transients(
    lines: &[String],
    watermark: Option<DateTime<Utc>>,
    mut armed: HashSet<TransientKind>,
) -> (Vec<TransientHit>, Option<DateTime<Utc>>) {
    let mut hits = Vec::new();
    let mut newest: Option<DateTime<Utc>> = None;

    for line in lines {
        let Some(logged_at) = line_timestamp(line) else {
            continue;
        };

        if watermark.is_some_and(|mark| logged_at <= mark) {
            break;
        }
        if newest.is_none_or(|n| logged_at > n) {
            newest = Some(logged_at);
        }

        for kind in TransientKind::iter() {
            if !armed.contains(&kind) {
                continue;
            }
            if let Some((tier, detail)) = kind.match_line(line) {
                armed.remove(&kind);
                hits.push(TransientHit {
                    kind,
                    tier,
                    logged_at,
                    detail,
                });
            }
        }
    }

    (hits, newest)
}

/// Biome text from a `[BloxstrapRPC] {...}` payload.
pub fn rpc_biome_text(line: &str) -> Option<String> {
    let caps = RE_RPC_PAYLOAD.captures(line)?;
    let raw = &caps[1];
    let Ok(json) = serde_json::from_str::<Value>(raw) else {
        return None;
    };

    let as_text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

    if let Some(data) = json.get("data") {
        if let Some(text) = data.as_str() {
            return Some(text.to_string());
        }
        for key in ["biome", "currentBiome", "state", "details", "name"] {
            if let Some(text) = as_text(data.get(key)) {
                return Some(text);
            }
        }
    }

    as_text(json.get("state"))
        .or_else(|| as_text(json.get("details")))
        .or_else(|| match json.get("largeImage") {
            Some(Value::String(key)) => Some(key.clone()),
            Some(image) => as_text(image.get("key")),
            None => None,
        })
        .or_else(|| Some(raw.to_string()))
}
