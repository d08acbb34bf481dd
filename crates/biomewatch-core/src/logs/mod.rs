//! Log file discovery, assignment, and lock-safe reading.

mod candidates;
mod locator;
mod reader;

pub use candidates::{LogCandidate, scan_log_dirs};
pub use locator::{AssignmentMethod, LocatorSettings, LogLocator, LogMatch};
pub use reader::{LogTail, open_shared, read_prefix, read_recent_lines, snapshot_tail};
