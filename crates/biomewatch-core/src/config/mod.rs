//! Configuration for the detection engine.
//!
//! This module contains:
//! - `DetectionConfig` - runtime settings loaded from TOML
//! - Timing, locator, and reader constants used as defaults

mod settings;

pub use settings::*;

/// Detection cycle timing.
pub mod timing {
    /// Delay between detection cycles.
    pub const POLL_INTERVAL_MS: u64 = 2000;

    /// Delay after a cycle that reported failures.
    pub const ERROR_BACKOFF_MS: u64 = 5000;
}

/// Log file assignment heuristics.
///
/// These windows were tuned against real client logs; they are defaults,
/// not invariants.
pub mod locator {
    /// Newest candidates inspected by the filename heuristic.
    pub const FILENAME_CANDIDATE_CAP: usize = 100;

    /// Newest candidates inspected by the content heuristic.
    pub const CONTENT_CANDIDATE_CAP: usize = 50;

    /// Bytes read from the head of each candidate for the content heuristic.
    pub const CONTENT_PREFIX_BYTES: usize = 32 * 1024;

    /// Maximum distance between process start and log creation.
    pub const TEMPORAL_WINDOW_SECS: i64 = 120;

    /// State-directory logs scanned when the primary log has no username.
    pub const IDENTITY_FALLBACK_CANDIDATES: usize = 3;
}

/// Log reading limits.
pub mod reader {
    /// Most recent lines handed to the extractor each cycle.
    pub const TAIL_LINES: usize = 2000;

    /// Bytes read from the head of a log when resolving the username.
    pub const IDENTITY_PREFIX_BYTES: usize = 2 * 1024 * 1024;

    /// Block size used when walking a snapshot backwards.
    pub const REVERSE_CHUNK_BYTES: usize = 64 * 1024;
}
