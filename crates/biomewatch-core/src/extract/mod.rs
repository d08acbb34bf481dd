//! Structured state extraction from client log lines.
//!
//! - `state` - biome, aura, and the transient-event walk
//! - `events` - transient event families and their match tiers
//! - `identity` - player name resolution
//! - `patterns` - compiled regexes shared by the above

mod events;
mod identity;
pub mod patterns;
mod state;

pub use events::{EventDetail, MatchTier, TransientHit, TransientKind};
pub use identity::resolve_username;
pub use state::{
    ExtractionResult, StateExtractor, StateMatch, latest_aura, line_timestamp, rpc_biome_text,
    scan_transients,
};
