use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Display,
    EnumIter,
    IntoStaticStr,
)]
pub enum BiomeType {
    // Standard biomes
    #[default]
    Normal,
    Sandstorm,
    Hell,
    Starfall,
    Heaven,
    Corruption,
    Null,
    Glitched,
    Dreamspace,
    Cyberspace,

    // Weather
    Windy,
    Snowy,
    Rainy,

    // Event biomes
    PumpkinMoon,
    Graveyard,
    BloodRain,
    Aurora,

    Unknown,
}

impl BiomeType {
    pub fn is_unknown(&self) -> bool {
        *self == Self::Unknown
    }

    pub fn id(&self) -> &'static str {
        self.into()
    }
}

/// Display metadata for one canonical biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeMetadata {
    pub biome: BiomeType,
    pub display_name: String,
    pub spawn_chance: String,
    pub duration: String,
    /// Hex color, `#RRGGBB`
    pub color: String,
    /// 0 = common, higher = rarer
    pub rarity: u32,
    pub multiplier: f64,
    /// Lowercase phrases that identify the biome in free text
    pub keywords: Vec<String>,
}

impl BiomeMetadata {
    /// Parse `color` into RGB components
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some((r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biome_id() {
        assert_eq!(BiomeType::PumpkinMoon.id(), "PumpkinMoon");
        assert_eq!(BiomeType::Sandstorm.to_string(), "Sandstorm");
        assert_eq!(BiomeType::default(), BiomeType::Normal);
    }

    #[test]
    fn test_rgb() {
        let meta = BiomeMetadata {
            biome: BiomeType::Hell,
            display_name: "Hell".into(),
            spawn_chance: String::new(),
            duration: String::new(),
            color: "#F44336".into(),
            rarity: 4,
            multiplier: 6.0,
            keywords: vec![],
        };
        assert_eq!(meta.rgb(), Some((0xF4, 0x43, 0x36)));

        let bad = BiomeMetadata {
            color: "red".into(),
            ..meta.clone()
        };
        assert_eq!(bad.rgb(), None);

        // Six bytes but not six hex digits
        let multibyte = BiomeMetadata {
            color: "#éaéa".into(),
            ..meta
        };
        assert_eq!(multibyte.rgb(), None);
    }
}
