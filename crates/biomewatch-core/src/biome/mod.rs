//! Canonical biome classification.

mod table;
mod types;

pub use table::*;
pub use types::*;
