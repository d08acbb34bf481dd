use super::{BiomeMetadata, BiomeType};

/// Immutable biome lookup, built once at startup and shared by reference.
///
/// Classification order:
/// 1. Case-insensitive exact match on a display name
/// 2. Keyword substring match, longest keyword first, so a short keyword
///    never shadows a longer, more specific one
#[derive(Debug, Clone)]
pub struct BiomeTable {
    entries: Vec<BiomeMetadata>,
    unknown: BiomeMetadata,
    /// Every keyword of every entry, longest first
    keywords: Vec<(String, BiomeType)>,
}

impl BiomeTable {
    pub fn new(entries: Vec<BiomeMetadata>) -> Self {
        let (unknowns, entries): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|e| e.biome.is_unknown());
        let unknown = unknowns.into_iter().next().unwrap_or_else(unknown_entry);

        let mut keywords: Vec<(String, BiomeType)> = entries
            .iter()
            .flat_map(|e| e.keywords.iter().map(|k| (k.to_lowercase(), e.biome)))
            .collect();
        // Stable sort keeps table order among equal lengths
        keywords.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            entries,
            unknown,
            keywords,
        }
    }

    /// The built-in table of known biomes
    pub fn builtin() -> Self {
        Self::new(builtin_entries())
    }

    /// Resolve free text to a canonical biome, or `Unknown`
    pub fn classify(&self, text: &str) -> BiomeType {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return BiomeType::Unknown;
        }

        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.display_name.to_lowercase() == lower)
        {
            return entry.biome;
        }

        self.keywords
            .iter()
            .find(|(keyword, _)| lower.contains(keyword.as_str()))
            .map(|(_, biome)| *biome)
            .unwrap_or(BiomeType::Unknown)
    }

    pub fn metadata(&self, biome: BiomeType) -> &BiomeMetadata {
        self.entries
            .iter()
            .find(|e| e.biome == biome)
            .unwrap_or(&self.unknown)
    }

    pub fn display_name(&self, biome: BiomeType) -> &str {
        &self.metadata(biome).display_name
    }

    /// Known entries in table order (excludes `Unknown`)
    pub fn entries(&self) -> &[BiomeMetadata] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BiomeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn unknown_entry() -> BiomeMetadata {
    entry(BiomeType::Unknown, "Unknown", "?", "?", "#757575", 0, 1.0, &[])
}

#[allow(clippy::too_many_arguments)]
fn entry(
    biome: BiomeType,
    display_name: &str,
    spawn_chance: &str,
    duration: &str,
    color: &str,
    rarity: u32,
    multiplier: f64,
    keywords: &[&str],
) -> BiomeMetadata {
    BiomeMetadata {
        biome,
        display_name: display_name.to_string(),
        spawn_chance: spawn_chance.to_string(),
        duration: duration.to_string(),
        color: color.to_string(),
        rarity,
        multiplier,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn builtin_entries() -> Vec<BiomeMetadata> {
    use BiomeType::*;

    vec![
        entry(Normal, "Normal", "Default", "Permanent", "#7CB342", 0, 1.0, &["normal", "default", "base"]),
        entry(Sandstorm, "Sandstorm", "1/3,000/sec", "~11 min", "#FFB74D", 3, 4.0, &["sandstorm", "sand storm", "desert"]),
        entry(Hell, "Hell", "1/6,666/sec", "~11 min", "#F44336", 4, 6.0, &["hell", "inferno", "lava"]),
        entry(Starfall, "Starfall", "1/7,500/sec", "Variable", "#7C4DFF", 5, 5.0, &["starfall", "star fall", "falling stars"]),
        entry(Heaven, "Heaven", "Rare", "Variable", "#FFEB3B", 6, 2.0, &["heaven", "heavenly", "divine"]),
        entry(Corruption, "Corruption", "1/9,000/sec", "~11 min", "#9C27B0", 5, 5.0, &["corruption", "corrupt", "corrupted"]),
        entry(Null, "Null", "1/10,100/sec", "Variable", "#9E9E9E", 6, 1000.0, &["null", "void", "undefined"]),
        entry(Glitched, "Glitched", "1/30,000 on change", "Variable", "#00E676", 8, 1.0, &["glitched", "glitch", "error"]),
        entry(Dreamspace, "Dreamspace", "1/3,500,000/sec", "~3 min", "#FF69B4", 10, 1.0, &["dreamspace", "dream space"]),
        entry(Cyberspace, "Cyberspace", "1/5,000 (controller)", "~12 min", "#00FFFF", 7, 2.0, &["cyberspace", "cyber", "digital"]),
        entry(Windy, "Windy", "1/500/sec", "Variable", "#B0BEC5", 1, 3.0, &["windy", "wind", "gusty"]),
        entry(Snowy, "Snowy", "1/750/sec", "Variable", "#E3F2FD", 2, 3.0, &["snowy", "snow", "blizzard", "winter"]),
        entry(Rainy, "Rainy", "1/750/sec", "Variable", "#42A5F5", 2, 4.0, &["rainy", "rain", "storm"]),
        entry(PumpkinMoon, "Pumpkin Moon", "Event", "Event", "#FF6F00", 7, 1.0, &["pumpkin moon", "pumpkin", "halloween"]),
        entry(Graveyard, "Graveyard", "Event", "Event", "#37474F", 7, 1.0, &["graveyard", "grave", "cemetery"]),
        entry(BloodRain, "Blood Rain", "Event", "Event", "#B71C1C", 8, 1.0, &["blood rain", "bloodrain", "blood"]),
        entry(Aurora, "Aurora", "Event", "Event", "#26C6DA", 7, 1.0, &["aurora", "northern lights", "borealis"]),
        unknown_entry(),
    ]
}
