//! Map a process to the log file it writes.
//!
//! Client logs carry no reliable process id field, so assignment walks a
//! chain of heuristics, strongest first:
//!
//! 1. Filename: the hex pid appears as a delimited token in the file name
//! 2. Content: the decimal pid appears in a known context near the file head
//! 3. Temporal: the file was created close to the process start time
//!
//! Every pool excludes files that another instance already owns.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::config::DetectionConfig;

use super::{LogCandidate, read_prefix};

/// Heuristic tier that produced an assignment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
pub enum AssignmentMethod {
    #[strum(serialize = "filename match")]
    Filename,
    #[strum(serialize = "content match")]
    Content,
    #[strum(serialize = "time match")]
    Temporal,
}

/// A successful assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMatch {
    pub path: PathBuf,
    pub method: AssignmentMethod,
    /// Distance between file creation and process start, for temporal matches
    pub time_diff_secs: Option<i64>,
}

impl LogMatch {
    /// Human description, e.g. `time match: 4s`
    pub fn describe(&self) -> String {
        match self.time_diff_secs {
            Some(diff) => format!("{}: {}s", self.method, diff),
            None => self.method.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorSettings {
    pub filename_candidate_cap: usize,
    pub content_candidate_cap: usize,
    pub content_prefix_bytes: usize,
    pub temporal_window_secs: i64,
}

impl From<&DetectionConfig> for LocatorSettings {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            filename_candidate_cap: config.filename_candidate_cap,
            content_candidate_cap: config.content_candidate_cap,
            content_prefix_bytes: config.content_prefix_bytes,
            temporal_window_secs: config.temporal_window_secs,
        }
    }
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogLocator {
    settings: LocatorSettings,
}

impl LogLocator {
    pub fn new(settings: LocatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LocatorSettings {
        &self.settings
    }

    /// Run the full heuristic chain for one process.
    ///
    /// `candidates` must be sorted newest-modified first.
    pub fn locate(
        &self,
        pid: u32,
        start_time: Option<DateTime<Utc>>,
        candidates: &[LogCandidate],
        excluded: &HashSet<PathBuf>,
    ) -> Option<LogMatch> {
        if let Some(candidate) = self.match_filename(pid, candidates, excluded) {
            return Some(LogMatch {
                path: candidate.path.clone(),
                method: AssignmentMethod::Filename,
                time_diff_secs: None,
            });
        }

        if let Some(candidate) = self.match_content(pid, candidates, excluded) {
            return Some(LogMatch {
                path: candidate.path.clone(),
                method: AssignmentMethod::Content,
                time_diff_secs: None,
            });
        }

        let start_time = start_time?;
        self.match_temporal(start_time, candidates, excluded)
            .map(|(candidate, diff)| LogMatch {
                path: candidate.path.clone(),
                method: AssignmentMethod::Temporal,
                time_diff_secs: Some(diff),
            })
    }

    /// Resolve the state log, which only the temporal heuristic can place.
    pub fn locate_state_log(
        &self,
        start_time: DateTime<Utc>,
        candidates: &[LogCandidate],
        excluded: &HashSet<PathBuf>,
    ) -> Option<LogMatch> {
        self.match_temporal(start_time, candidates, excluded)
            .map(|(candidate, diff)| LogMatch {
                path: candidate.path.clone(),
                method: AssignmentMethod::Temporal,
                time_diff_secs: Some(diff),
            })
    }

    /// Tier 1: hex pid as a delimited token in the file name.
    pub fn match_filename<'a>(
        &self,
        pid: u32,
        candidates: &'a [LogCandidate],
        excluded: &HashSet<PathBuf>,
    ) -> Option<&'a LogCandidate> {
        candidates
            .iter()
            .take(self.settings.filename_candidate_cap)
            .filter(|c| !excluded.contains(&c.path))
            .find(|c| file_name_has_pid(c.file_name(), pid))
    }

    /// Tier 2: decimal pid in the head of the file.
    pub fn match_content<'a>(
        &self,
        pid: u32,
        candidates: &'a [LogCandidate],
        excluded: &HashSet<PathBuf>,
    ) -> Option<&'a LogCandidate> {
        candidates
            .iter()
            .take(self.settings.content_candidate_cap)
            .filter(|c| !excluded.contains(&c.path))
            .find(|c| self.head_mentions_pid(&c.path, pid))
    }

    /// Tier 3: creation time closest to the process start, inside the window.
    pub fn match_temporal<'a>(
        &self,
        start_time: DateTime<Utc>,
        candidates: &'a [LogCandidate],
        excluded: &HashSet<PathBuf>,
    ) -> Option<(&'a LogCandidate, i64)> {
        self.within_window(start_time, candidates, excluded)
            .into_iter()
            .next()
    }

    /// Candidates created inside the window, closest first.
    pub fn within_window<'a>(
        &self,
        start_time: DateTime<Utc>,
        candidates: &'a [LogCandidate],
        excluded: &HashSet<PathBuf>,
    ) -> Vec<(&'a LogCandidate, i64)> {
        let window_ms = self.settings.temporal_window_secs.saturating_mul(1000);
        let mut matches: Vec<(&LogCandidate, i64)> = candidates
            .iter()
            .filter(|c| !excluded.contains(&c.path))
            .map(|c| (c, (c.created - start_time).num_milliseconds().abs()))
            .filter(|(_, diff_ms)| *diff_ms <= window_ms)
            .collect();
        // Stable: equal distances keep newest-modified order
        matches.sort_by_key(|(_, diff_ms)| *diff_ms);
        matches
            .into_iter()
            .map(|(c, diff_ms)| (c, diff_ms / 1000))
            .collect()
    }

    fn head_mentions_pid(&self, path: &Path, pid: u32) -> bool {
        match read_prefix(path, self.settings.content_prefix_bytes) {
            Ok(head) => content_mentions_pid(&head, pid),
            Err(e) => {
                debug!("Content check skipped {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Whether the hex pid (any case) appears in `file_name` bounded by
/// non-alphanumeric characters.
pub fn file_name_has_pid(file_name: &str, pid: u32) -> bool {
    let needle = format!("{:x}", pid);
    let haystack = file_name.to_ascii_lowercase();

    haystack.match_indices(&needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        let delimited = |c: Option<char>| c.is_some_and(|c| !c.is_ascii_alphanumeric());
        delimited(before) && delimited(after)
    })
}

/// Whether `content` names the decimal pid in one of the contexts the client
/// writes it in.
pub fn content_mentions_pid(content: &str, pid: u32) -> bool {
    [
        format!("pid:{}", pid),
        format!("PID: {}", pid),
        format!(",{:x},", pid),
        format!(" {} ", pid),
    ]
    .iter()
    .any(|needle| {
        content.match_indices(needle.as_str()).any(|(idx, _)| {
            let after = content[idx + needle.len()..].chars().next();
            !after.is_some_and(|c| c.is_ascii_digit())
        })
    })
}
