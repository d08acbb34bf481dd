//! Mock process provider for testing
//!
//! Serves a process list from shared memory instead of the OS, so tests can
//! start and stop "processes" between detection cycles.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

use super::{ProcessDescriptor, ProcessProvider};

/// Mock process provider
///
/// Clones share the same process list: keep one clone in the test and hand
/// the other to the engine.
#[derive(Debug, Clone, Default)]
pub struct MockProcessProvider {
    processes: Arc<Mutex<Vec<ProcessDescriptor>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl MockProcessProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process to the list
    pub fn spawn(&self, pid: u32, name: &str, start_time: Option<DateTime<Utc>>) {
        if let Ok(mut processes) = self.processes.lock() {
            processes.push(ProcessDescriptor::new(pid, name, start_time));
        }
    }

    /// Remove a process from the list
    pub fn kill(&self, pid: u32) {
        if let Ok(mut processes) = self.processes.lock() {
            processes.retain(|p| p.pid != pid);
        }
    }

    /// Make the next enumeration fail
    pub fn fail_next(&self) {
        if let Ok(mut flag) = self.fail_next.lock() {
            *flag = true;
        }
    }
}

impl ProcessProvider for MockProcessProvider {
    fn find_processes(&mut self, filter: &dyn Fn(&str) -> bool) -> Result<Vec<ProcessDescriptor>> {
        if let Ok(mut flag) = self.fail_next.lock()
            && *flag
        {
            *flag = false;
            return Err(Error::ProcessEnumeration("mock enumeration failure".to_string()));
        }

        let processes = self
            .processes
            .lock()
            .map_err(|e| Error::ProcessEnumeration(e.to_string()))?;
        Ok(processes.iter().filter(|p| filter(&p.name)).cloned().collect())
    }
}
