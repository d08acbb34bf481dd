use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Error, Result};

/// A log file that may belong to a tracked process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCandidate {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    /// Creation time, or the modification time where the filesystem has none
    pub created: DateTime<Utc>,
}

impl LogCandidate {
    pub fn new(path: impl Into<PathBuf>, modified: DateTime<Utc>, created: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            modified,
            created,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified()?;
        let created = metadata.created().unwrap_or(modified);
        Ok(Self {
            path: path.to_path_buf(),
            modified: to_utc(modified),
            created: to_utc(created),
        })
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Collect `*.<extension>` files from every directory, newest-modified first.
///
/// Missing directories are skipped; an unreadable directory is an error.
pub fn scan_log_dirs(dirs: &[PathBuf], extension: &str) -> Result<Vec<LogCandidate>> {
    let mut candidates = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            debug!("Log directory does not exist: {}", dir.display());
            continue;
        }

        let entries = fs::read_dir(dir).map_err(|source| Error::LogDirectory {
            path: dir.clone(),
            source,
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if !matches_ext || !path.is_file() {
                continue;
            }

            // Files can vanish between listing and stat
            match LogCandidate::from_path(&path) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    candidates.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(candidates)
}
