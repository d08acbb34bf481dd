use std::collections::HashMap;

use tracing::debug;

use crate::config::process_name_matches;
use crate::error::Result;

use super::{ProcessDescriptor, ProcessProvider};

/// Processes that appeared or vanished since the previous refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessDelta {
    pub added: Vec<ProcessDescriptor>,
    pub removed: Vec<u32>,
}

impl ProcessDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Tracks the live set of game client processes.
pub struct ProcessRegistry<P: ProcessProvider> {
    provider: P,
    process_names: Vec<String>,
    known: HashMap<u32, ProcessDescriptor>,
}

impl<P: ProcessProvider> ProcessRegistry<P> {
    pub fn new(provider: P, process_names: Vec<String>) -> Self {
        Self {
            provider,
            process_names,
            known: HashMap::new(),
        }
    }

    /// Enumerate matching processes and diff against the known set.
    ///
    /// On error the known set is left untouched, so the failed cycle behaves
    /// like an empty delta and the next cycle retries.
    pub fn refresh(&mut self) -> Result<ProcessDelta> {
        let names = &self.process_names;
        let filter = |name: &str| process_name_matches(names, name);
        let current = self.provider.find_processes(&filter)?;

        let mut current_by_pid: HashMap<u32, ProcessDescriptor> =
            current.into_iter().map(|p| (p.pid, p)).collect();

        let mut delta = ProcessDelta::default();

        for (pid, known) in &self.known {
            match current_by_pid.get(pid) {
                None => delta.removed.push(*pid),
                Some(current) if is_reused(known, current) => {
                    debug!("PID {} was reused by a new process", pid);
                    delta.removed.push(*pid);
                }
                Some(_) => {
                    current_by_pid.remove(pid);
                }
            }
        }

        for pid in &delta.removed {
            self.known.remove(pid);
        }

        let mut added: Vec<ProcessDescriptor> = current_by_pid.into_values().collect();
        added.sort_by_key(|p| p.pid);
        for process in &added {
            self.known.insert(process.pid, process.clone());
        }

        delta.removed.sort_unstable();
        delta.added = added;
        Ok(delta)
    }

    pub fn is_live(&self, pid: u32) -> bool {
        self.known.contains_key(&pid)
    }

    pub fn live_pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.known.keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

/// Same PID, different start time: the original process exited
fn is_reused(known: &ProcessDescriptor, current: &ProcessDescriptor) -> bool {
    matches!(
        (known.start_time, current.start_time),
        (Some(a), Some(b)) if a != b
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockProcessProvider;
    use chrono::{Duration, Utc};

    fn registry(handle: &MockProcessProvider) -> ProcessRegistry<MockProcessProvider> {
        ProcessRegistry::new(handle.clone(), vec!["Client".to_string()])
    }

    #[test]
    fn test_added_and_removed() {
        let handle = MockProcessProvider::new();
        let mut registry = registry(&handle);

        handle.spawn(10, "Client", None);
        handle.spawn(20, "Client.exe", None);
        handle.spawn(30, "Browser", None);

        let delta = registry.refresh().unwrap();
        let added: Vec<u32> = delta.added.iter().map(|p| p.pid).collect();
        assert_eq!(added, vec![10, 20]);
        assert!(delta.removed.is_empty());

        // No change
        assert!(registry.refresh().unwrap().is_empty());

        handle.kill(10);
        let delta = registry.refresh().unwrap();
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, vec![10]);
        assert_eq!(registry.live_pids(), vec![20]);
    }

    #[test]
    fn test_error_keeps_known_set() {
        let handle = MockProcessProvider::new();
        let mut registry = registry(&handle);
        handle.spawn(10, "Client", None);
        registry.refresh().unwrap();

        handle.fail_next();
        assert!(registry.refresh().is_err());
        assert!(registry.is_live(10));

        // Recovers on the next cycle with no spurious delta
        assert!(registry.refresh().unwrap().is_empty());
    }

    #[test]
    fn test_pid_reuse_is_new_process() {
        let handle = MockProcessProvider::new();
        let mut registry = registry(&handle);
        let first = Utc::now() - Duration::hours(1);
        handle.spawn(10, "Client", Some(first));
        registry.refresh().unwrap();

        handle.kill(10);
        handle.spawn(10, "Client", Some(Utc::now()));
        let delta = registry.refresh().unwrap();
        assert_eq!(delta.removed, vec![10]);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.added[0].pid, 10);
        assert_ne!(delta.added[0].start_time, Some(first));
    }
}
