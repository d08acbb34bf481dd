use anyhow::Result;
use biomewatch_core::BiomeTable;

use crate::console::colored_biome;

/// Print the biome that free text resolves to
pub fn run(text: &str) -> Result<()> {
    let table = BiomeTable::builtin();
    let biome = table.classify(text);
    let meta = table.metadata(biome);

    println!("{:?} -> {} ({})", text, colored_biome(meta), biome.id());
    if !biome.is_unknown() {
        println!("  Spawn chance : {}", meta.spawn_chance);
        println!("  Duration     : {}", meta.duration);
        println!("  Rarity       : {}", meta.rarity);
        println!("  Multiplier   : x{}", meta.multiplier);
    }
    Ok(())
}
