use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::biome::BiomeType;
use crate::extract::{TransientHit, TransientKind};
use crate::logs::AssignmentMethod;
use crate::process::ProcessDescriptor;

/// Set-once flag for a transient event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransientFlag {
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub last_hit: Option<TransientHit>,
}

/// One live game client and everything extracted for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedInstance {
    pub pid: u32,
    pub process_name: String,
    /// `Instance <pid>` until the username is known
    pub display_name: String,
    pub start_time: Option<DateTime<Utc>>,

    pub primary_log: Option<PathBuf>,
    /// Zero until the first identity attempt on the primary log
    pub primary_cursor: u64,
    pub assignment: Option<AssignmentMethod>,

    pub state_log: Option<PathBuf>,
    /// Offset just past the last complete line consumed from `state_source`
    pub state_cursor: u64,
    /// File `state_cursor` refers to
    pub state_source: Option<PathBuf>,

    pub username: Option<String>,
    pub biome: BiomeType,
    pub biome_label: Option<String>,
    pub state_changed_at: Option<DateTime<Utc>>,
    pub aura: Option<String>,
    pub transients: BTreeMap<TransientKind, TransientFlag>,
    /// Log lines at or before this time are never scanned for events again
    pub last_event_time: Option<DateTime<Utc>>,
}

impl TrackedInstance {
    pub fn new(pid: u32, process_name: impl Into<String>, start_time: Option<DateTime<Utc>>) -> Self {
        Self {
            pid,
            process_name: process_name.into(),
            display_name: format!("Instance {}", pid),
            start_time,
            primary_log: None,
            primary_cursor: 0,
            assignment: None,
            state_log: None,
            state_cursor: 0,
            state_source: None,
            username: None,
            biome: BiomeType::Unknown,
            biome_label: None,
            state_changed_at: None,
            aura: None,
            transients: TransientKind::iter()
                .map(|kind| (kind, TransientFlag::default()))
                .collect(),
            last_event_time: None,
        }
    }

    pub fn from_descriptor(process: &ProcessDescriptor) -> Self {
        Self::new(process.pid, process.name.clone(), process.start_time)
    }

    pub fn has_fired(&self, kind: TransientKind) -> bool {
        self.transients.get(&kind).is_some_and(|f| f.triggered)
    }

    pub fn is_assigned(&self) -> bool {
        self.primary_log.is_some()
    }

    /// Log read for state and events: the state log, else the primary log
    pub fn state_target(&self) -> Option<&Path> {
        self.state_log.as_deref().or(self.primary_log.as_deref())
    }

    pub(crate) fn clear_transients(&mut self) {
        for flag in self.transients.values_mut() {
            *flag = TransientFlag::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_instance_defaults() {
        let instance = TrackedInstance::new(42, "Client", None);
        assert_eq!(instance.display_name, "Instance 42");
        assert_eq!(instance.biome, BiomeType::Unknown);
        assert_eq!(instance.transients.len(), 3);
        assert!(!instance.has_fired(TransientKind::Eden));
        assert!(instance.state_target().is_none());
    }

    #[test]
    fn test_state_target_prefers_state_log() {
        let mut instance = TrackedInstance::new(1, "Client", None);
        instance.primary_log = Some(PathBuf::from("primary.log"));
        assert_eq!(instance.state_target(), Some(Path::new("primary.log")));

        instance.state_log = Some(PathBuf::from("state.log"));
        assert_eq!(instance.state_target(), Some(Path::new("state.log")));
    }
}
