use chrono::{DateTime, Utc};
use sysinfo::System;

use crate::error::Result;

use super::{ProcessDescriptor, ProcessProvider};

/// Process provider backed by the operating system process table.
pub struct SystemProcessProvider {
    system: System,
}

impl SystemProcessProvider {
    pub fn new() -> Self {
        // Empty System, no initial scan; processes are refreshed per call
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProcessProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProvider for SystemProcessProvider {
    fn find_processes(&mut self, filter: &dyn Fn(&str) -> bool) -> Result<Vec<ProcessDescriptor>> {
        self.system.refresh_processes();

        let mut found: Vec<ProcessDescriptor> = self
            .system
            .processes()
            .iter()
            .filter(|(_, process)| filter(process.name()))
            .map(|(pid, process)| ProcessDescriptor {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                start_time: start_time_from_secs(process.start_time()),
            })
            .collect();

        found.sort_by_key(|p| p.pid);
        Ok(found)
    }
}

/// Convert a Unix start time in seconds, treating 0 as unavailable
fn start_time_from_secs(secs: u64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}
