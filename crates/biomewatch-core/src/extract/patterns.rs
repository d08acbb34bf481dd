//! Compiled regex patterns for parsing client log lines.
//!
//! These patterns are compiled once on first use. Order inside each slice is
//! the matching priority. Update these when the client log format changes.

use once_cell::sync::Lazy;
use regex::Regex;

// ═══════════════════════════════════════════════════════════════════════════════
// Line Structure
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_LOG_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z)").unwrap());
pub static RE_RPC_PAYLOAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[BloxstrapRPC\]\s*(\{.*\})").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Biome
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_BIOME: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""largeImage":\{"hoverText":"([^"]+)""#,
        r#"(?i)"biome":\s*"([^"]+)""#,
        r"(?:Biome|biome|BIOME)[:\s]+([A-Z\s]+)",
        r"(?i)(?:Changed to|changed to)\s+([A-Z\s]+)",
        r"BIOME_CHANGED\s+([A-Z\s]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// ═══════════════════════════════════════════════════════════════════════════════
// Aura
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_AURA: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""state":"Equipped \\"([^"]+)\\"""#,
        r#""hoverText":"Aura:\s*([^"]+)""#,
        r#"(?i)Equipped\s+['"]([^'"]+)['"]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// ═══════════════════════════════════════════════════════════════════════════════
// Transient Events
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_MERCHANT: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Mari.*has\s+arrived",
        r"(?i)Traveling\s+Merchant.*arrived",
        r#"(?i)"hoverText":"Mari""#,
        r"(?i)Merchant\s+(?:has\s+)?(?:spawned|appeared)",
        r"(?i)Mari.*spawn",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub static RE_JESTER: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Jester.*has\s+arrived",
        r"(?i)Jester.*spawn",
        r#"(?i)"hoverText":"Jester""#,
        r"(?i)Jester\s+(?:has\s+)?(?:spawned|appeared)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub static RE_EDEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)The Devourer of the Void, <b>(.*?)</b> has appeared somewhere in <i>(.*?)</i>\.",
    )
    .unwrap()
});

// ═══════════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_DISPLAY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""displayName"\s*:\s*"([A-Za-z0-9_]{3,20})""#).unwrap());
pub static RE_PLAYER_JOINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Player\s+([A-Za-z0-9_]{3,20})\s+(?:joined|added|entered)").unwrap()
});
pub static RE_PLAYERS_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Players\.([A-Za-z0-9_]{3,20})(?:[^A-Za-z0-9_]|$)").unwrap());

pub static RE_USERNAME_FALLBACK: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"displayName[":\s]+([A-Za-z0-9_]{3,20})"#,
        r"Players\.([A-Za-z0-9_]{3,20})(?:[^A-Za-z0-9_]|$)",
        r#""name":"([A-Za-z0-9_]{3,20})""#,
        r"user:\s*([A-Za-z0-9_]{3,20})",
        r"Player\s+([A-Za-z0-9_]{3,20})\s+added",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
