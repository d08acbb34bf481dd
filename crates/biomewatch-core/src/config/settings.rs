use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{locator, reader, timing};

/// Runtime settings for the detection engine.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Executable names of the game client (case-insensitive, `.exe` optional)
    pub process_names: Vec<String>,
    /// Directories holding the primary (launcher or client) logs
    pub log_dirs: Vec<PathBuf>,
    /// Directories holding the client logs that carry state/event lines
    pub state_log_dirs: Vec<PathBuf>,
    /// Extension of log files, without the dot
    pub log_extension: String,
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
    pub filename_candidate_cap: usize,
    pub content_candidate_cap: usize,
    pub content_prefix_bytes: usize,
    pub temporal_window_secs: i64,
    pub tail_lines: usize,
    pub identity_prefix_bytes: usize,
    pub identity_fallback_candidates: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let local = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        let client_logs = local.join("Roblox").join("logs");

        Self {
            process_names: vec![
                "RobloxPlayerBeta".to_string(),
                "Windows10Universal".to_string(),
            ],
            log_dirs: vec![
                client_logs.clone(),
                local.join("Bloxstrap").join("Logs"),
                local.join("Voidstrap").join("Logs"),
            ],
            state_log_dirs: vec![client_logs],
            log_extension: "log".to_string(),
            poll_interval_ms: timing::POLL_INTERVAL_MS,
            error_backoff_ms: timing::ERROR_BACKOFF_MS,
            filename_candidate_cap: locator::FILENAME_CANDIDATE_CAP,
            content_candidate_cap: locator::CONTENT_CANDIDATE_CAP,
            content_prefix_bytes: locator::CONTENT_PREFIX_BYTES,
            temporal_window_secs: locator::TEMPORAL_WINDOW_SECS,
            tail_lines: reader::TAIL_LINES,
            identity_prefix_bytes: reader::IDENTITY_PREFIX_BYTES,
            identity_fallback_candidates: locator::IDENTITY_FALLBACK_CANDIDATES,
        }
    }
}

impl DetectionConfig {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse settings from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Load settings, falling back to defaults when the file is missing or invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Failed to load config {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Check whether a process name belongs to the game client
    pub fn matches_process(&self, name: &str) -> bool {
        process_name_matches(&self.process_names, name)
    }
}

/// Case-insensitive executable name match, ignoring a `.exe` suffix
pub fn process_name_matches(names: &[String], name: &str) -> bool {
    let name = strip_exe(name);
    names
        .iter()
        .any(|target| strip_exe(target).eq_ignore_ascii_case(name))
}

fn strip_exe(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
        &name[..len - 4]
    } else {
        name
    }
}
