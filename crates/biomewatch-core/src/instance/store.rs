use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::extract::{ExtractionResult, TransientHit};
use crate::logs::LogMatch;
use crate::process::ProcessDescriptor;

use super::TrackedInstance;

/// A field change produced by [`InstanceStore::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceChange {
    StateChanged,
    AuraChanged,
    TransientFired(TransientHit),
}

/// Owns every [`TrackedInstance`], keyed by pid.
///
/// All mutation goes through this type so assignment exclusivity, the
/// monotonic watermark and set-once event flags hold in one place.
#[derive(Debug, Default)]
pub struct InstanceStore {
    instances: BTreeMap<u32, TrackedInstance>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a process, replacing any stale record with the same pid.
    pub fn add(&mut self, process: &ProcessDescriptor) -> &TrackedInstance {
        let instance = TrackedInstance::from_descriptor(process);
        self.instances.insert(process.pid, instance);
        &self.instances[&process.pid]
    }

    pub fn remove(&mut self, pid: u32) -> Option<TrackedInstance> {
        self.instances.remove(&pid)
    }

    pub fn get(&self, pid: u32) -> Option<&TrackedInstance> {
        self.instances.get(&pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.instances.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn pids(&self) -> Vec<u32> {
        self.instances.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedInstance> {
        self.instances.values()
    }

    pub fn for_each<F: FnMut(&TrackedInstance)>(&self, f: F) {
        self.instances.values().for_each(f);
    }

    /// Cloned records for consumers outside the detection cycle
    pub fn snapshot(&self) -> Vec<TrackedInstance> {
        self.instances.values().cloned().collect()
    }

    /// Files owned by instances other than `except`.
    pub fn assigned_logs(&self, except: Option<u32>) -> HashSet<PathBuf> {
        self.instances
            .values()
            .filter(|i| Some(i.pid) != except)
            .flat_map(|i| i.primary_log.iter().chain(i.state_log.iter()))
            .cloned()
            .collect()
    }

    fn owner_of(&self, path: &Path, except: u32) -> Option<u32> {
        self.instances
            .values()
            .find(|i| {
                i.pid != except
                    && (i.primary_log.as_deref() == Some(path) || i.state_log.as_deref() == Some(path))
            })
            .map(|i| i.pid)
    }

    /// Give `pid` its primary log. Refused if another instance owns the file.
    pub fn assign_primary(&mut self, pid: u32, found: &LogMatch) -> bool {
        if let Some(owner) = self.owner_of(&found.path, pid) {
            debug!("{} already belongs to PID {}", found.path.display(), owner);
            return false;
        }
        let Some(instance) = self.instances.get_mut(&pid) else {
            return false;
        };

        instance.primary_log = Some(found.path.clone());
        instance.primary_cursor = 0;
        instance.assignment = Some(found.method);
        true
    }

    pub fn release_primary(&mut self, pid: u32) {
        if let Some(instance) = self.instances.get_mut(&pid) {
            instance.primary_log = None;
            instance.primary_cursor = 0;
            instance.assignment = None;
        }
    }

    /// Give `pid` a state log. Its own primary log is allowed.
    pub fn assign_state_log(&mut self, pid: u32, path: &Path) -> bool {
        if let Some(owner) = self.owner_of(path, pid) {
            debug!("{} already belongs to PID {}", path.display(), owner);
            return false;
        }
        let Some(instance) = self.instances.get_mut(&pid) else {
            return false;
        };

        instance.state_log = Some(path.to_path_buf());
        true
    }

    pub fn release_state_log(&mut self, pid: u32) {
        if let Some(instance) = self.instances.get_mut(&pid) {
            instance.state_log = None;
        }
    }

    /// Record the resolved username. Returns whether it changed.
    pub fn set_username(&mut self, pid: u32, username: &str) -> bool {
        let Some(instance) = self.instances.get_mut(&pid) else {
            return false;
        };
        if instance.username.as_deref() == Some(username) {
            return false;
        }

        instance.username = Some(username.to_string());
        instance.display_name = username.to_string();
        true
    }

    pub fn set_primary_cursor(&mut self, pid: u32, offset: u64) {
        if let Some(instance) = self.instances.get_mut(&pid) {
            instance.primary_cursor = offset;
        }
    }

    /// Move the state cursor, resetting it when the source file changes.
    pub fn set_state_cursor(&mut self, pid: u32, source: &Path, offset: u64) {
        if let Some(instance) = self.instances.get_mut(&pid) {
            instance.state_source = Some(source.to_path_buf());
            instance.state_cursor = offset;
        }
    }

    /// Apply extracted changes to one instance.
    ///
    /// A state change clears every transient flag before the batch's events
    /// are applied. Flags already set are left alone, and the watermark only
    /// moves forward.
    pub fn apply(
        &mut self,
        pid: u32,
        result: &ExtractionResult,
        now: DateTime<Utc>,
    ) -> Vec<InstanceChange> {
        let mut changes = Vec::new();
        let Some(instance) = self.instances.get_mut(&pid) else {
            return changes;
        };

        if let Some(found) = &result.state
            && found.biome != instance.biome
        {
            info!(
                "{}: biome {} -> {}",
                instance.display_name, instance.biome, found.biome
            );
            instance.biome = found.biome;
            instance.biome_label = Some(found.label.clone());
            instance.state_changed_at = Some(now);
            instance.clear_transients();
            changes.push(InstanceChange::StateChanged);
        }

        if let Some(aura) = &result.aura
            && instance.aura.as_ref() != Some(aura)
        {
            instance.aura = Some(aura.clone());
            changes.push(InstanceChange::AuraChanged);
        }

        for hit in &result.events {
            let Some(flag) = instance.transients.get_mut(&hit.kind) else {
                continue;
            };
            if flag.triggered {
                continue;
            }

            info!("{}: {} detected ({})", instance.display_name, hit.kind, hit.tier);
            flag.triggered = true;
            flag.triggered_at = Some(now);
            flag.last_hit = Some(hit.clone());
            changes.push(InstanceChange::TransientFired(hit.clone()));
        }

        if let Some(mark) = result.watermark
            && instance.last_event_time.is_none_or(|current| mark > current)
        {
            instance.last_event_time = Some(mark);
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeType;
    use crate::extract::{MatchTier, StateMatch, TransientKind};
    use crate::logs::AssignmentMethod;
    use chrono::{Duration, TimeZone};

    fn store_with(pids: &[u32]) -> InstanceStore {
        let mut store = InstanceStore::new();
        for pid in pids {
            store.add(&ProcessDescriptor::new(*pid, "Client", None));
        }
        store
    }

    fn found(path: &str) -> LogMatch {
        LogMatch {
            path: PathBuf::from(path),
            method: AssignmentMethod::Filename,
            time_diff_secs: None,
        }
    }

    fn state(biome: BiomeType) -> StateMatch {
        StateMatch {
            biome,
            label: biome.to_string(),
            source_text: biome.to_string(),
        }
    }

    fn hit(kind: TransientKind) -> TransientHit {
        TransientHit {
            kind,
            tier: MatchTier::Exact,
            logged_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            detail: None,
        }
    }

    #[test]
    fn test_primary_assignment_is_exclusive() {
        let mut store = store_with(&[1, 2]);
        assert!(store.assign_primary(1, &found("a.log")));
        assert!(!store.assign_primary(2, &found("a.log")));
        assert!(store.get(2).unwrap().primary_log.is_none());

        // Reassigning to the owner is fine
        assert!(store.assign_primary(1, &found("a.log")));

        store.release_primary(1);
        assert!(store.assign_primary(2, &found("a.log")));
    }

    #[test]
    fn test_state_log_may_be_own_primary() {
        let mut store = store_with(&[1, 2]);
        store.assign_primary(1, &found("a.log"));
        assert!(store.assign_state_log(1, Path::new("a.log")));
        assert!(!store.assign_state_log(2, Path::new("a.log")));

        let owned = store.assigned_logs(Some(2));
        assert!(owned.contains(Path::new("a.log")));
        assert!(store.assigned_logs(Some(1)).is_empty());
    }

    #[test]
    fn test_same_state_applies_once() {
        let mut store = store_with(&[1]);
        let result = ExtractionResult {
            state: Some(state(BiomeType::Sandstorm)),
            ..Default::default()
        };

        let changes = store.apply(1, &result, Utc::now());
        assert_eq!(changes, vec![InstanceChange::StateChanged]);
        assert!(store.apply(1, &result, Utc::now()).is_empty());
    }

    #[test]
    fn test_transient_fires_once_until_state_change() {
        let mut store = store_with(&[1]);
        let events = ExtractionResult {
            events: vec![hit(TransientKind::Merchant)],
            ..Default::default()
        };

        assert_eq!(store.apply(1, &events, Utc::now()).len(), 1);
        assert!(store.apply(1, &events, Utc::now()).is_empty());

        let change_and_event = ExtractionResult {
            state: Some(state(BiomeType::Windy)),
            events: vec![hit(TransientKind::Merchant)],
            ..Default::default()
        };
        let changes = store.apply(1, &change_and_event, Utc::now());
        assert_eq!(changes.len(), 2);
        assert!(store.get(1).unwrap().has_fired(TransientKind::Merchant));
    }

    #[test]
    fn test_watermark_never_moves_back() {
        let mut store = store_with(&[1]);
        let later = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let forward = ExtractionResult {
            watermark: Some(later),
            ..Default::default()
        };
        store.apply(1, &forward, Utc::now());

        let backward = ExtractionResult {
            watermark: Some(later - Duration::minutes(5)),
            ..Default::default()
        };
        store.apply(1, &backward, Utc::now());
        assert_eq!(store.get(1).unwrap().last_event_time, Some(later));
    }

    #[test]
    fn test_username_sets_display_name() {
        let mut store = store_with(&[7]);
        assert!(store.set_username(7, "Nomad"));
        assert!(!store.set_username(7, "Nomad"));
        assert_eq!(store.get(7).unwrap().display_name, "Nomad");
    }

    #[test]
    fn test_remove_and_readd_is_fresh() {
        let mut store = store_with(&[5]);
        store.set_username(5, "Nomad");
        store.remove(5);
        store.add(&ProcessDescriptor::new(5, "Client", None));
        assert!(store.get(5).unwrap().username.is_none());
    }
}
