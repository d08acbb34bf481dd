//! Process provider abstraction for testability.
//!
//! This module provides the trait that abstracts process discovery,
//! enabling mock implementations for testing without a running game client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A live process as reported by the operating system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub pid: u32,
    pub name: String,
    /// Best-effort; only used for heuristic log matching
    pub start_time: Option<DateTime<Utc>>,
}

impl ProcessDescriptor {
    pub fn new(pid: u32, name: impl Into<String>, start_time: Option<DateTime<Utc>>) -> Self {
        Self {
            pid,
            name: name.into(),
            start_time,
        }
    }
}

/// Trait for enumerating processes.
///
/// This trait abstracts process discovery, allowing mock implementations
/// that don't require actual system processes.
pub trait ProcessProvider {
    /// List every live process whose name passes `filter`.
    fn find_processes(&mut self, filter: &dyn Fn(&str) -> bool) -> Result<Vec<ProcessDescriptor>>;
}
