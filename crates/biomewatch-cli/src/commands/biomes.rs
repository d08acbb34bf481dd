use anyhow::Result;
use biomewatch_core::BiomeTable;

use crate::console::{colored_biome, swatch};

/// List the classification table
pub fn run() -> Result<()> {
    let table = BiomeTable::builtin();

    println!(
        "   {:<14} {:>6} {:>8}  {:<22} {}",
        "Biome", "Rarity", "Mult", "Spawn chance", "Duration"
    );
    for meta in table.entries() {
        // Pad before coloring so ANSI codes don't skew the columns
        let name = format!("{:<14}", meta.display_name);
        let padding = name.len() - meta.display_name.len();
        println!(
            "{} {}{} {:>6} {:>8}  {:<22} {}",
            swatch(meta),
            colored_biome(meta),
            " ".repeat(padding),
            meta.rarity,
            format!("x{}", meta.multiplier),
            meta.spawn_chance,
            meta.duration
        );
    }
    println!("{} biomes", table.len());
    Ok(())
}
