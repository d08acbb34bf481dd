use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::extract::resolve_username;
use crate::instance::InstanceChange;
use crate::logs::{LogCandidate, read_prefix, scan_log_dirs, snapshot_tail};
use crate::process::ProcessProvider;

use super::{CycleReport, Engine, EngineEvent};

impl<P: ProcessProvider> Engine<P> {
    /// Run one full detection pass.
    pub fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        if let Err(e) = self.refresh_processes(&mut report) {
            self.fail(&mut report, "Process refresh failed", &e);
        }

        self.release_vanished_logs();

        if let Err(e) = self.assign_primary_logs(&mut report) {
            self.fail(&mut report, "Log assignment failed", &e);
        }

        // A state-directory log that names the player claims the instance
        // before the plain time match runs
        for pid in self.store.pids() {
            if let Err(e) = self.resolve_identity(pid) {
                self.fail(&mut report, &format!("Username lookup failed for PID {}", pid), &e);
            }
        }
        if let Err(e) = self.assign_state_logs() {
            self.fail(&mut report, "State log assignment failed", &e);
        }

        for pid in self.store.pids() {
            if let Err(e) = self.update_state(pid) {
                self.fail(&mut report, &format!("Log parse failed for PID {}", pid), &e);
            }
        }

        debug!(
            "Cycle done: {} tracked, +{} -{}, {} assigned, {} failure(s)",
            self.store.len(),
            report.added,
            report.removed,
            report.assigned,
            report.failures
        );
        report
    }

    fn fail(&self, report: &mut CycleReport, context: &str, error: &Error) {
        warn!("{}: {}", context, error);
        self.events.error(format!("{}: {}", context, error));
        report.failures += 1;
    }

    fn status(&self, message: String) {
        self.events.status(message);
    }

    fn refresh_processes(&mut self, report: &mut CycleReport) -> Result<()> {
        let delta = self.registry.refresh()?;

        // Removals first so a reused pid is re-added as a fresh instance
        for pid in delta.removed {
            self.unplaced.remove(&pid);
            if let Some(instance) = self.store.remove(pid) {
                info!("Instance {} (PID {}) closed", instance.display_name, pid);
                self.status(format!("Instance {} closed", instance.display_name));
                self.events.emit(EngineEvent::InstanceRemoved(instance));
                report.removed += 1;
            }
        }

        for process in &delta.added {
            let instance = self.store.add(process).clone();
            info!("Found new instance: PID {} ({})", process.pid, process.name);
            self.status(format!("Found new instance: PID {}", process.pid));
            self.events.emit(EngineEvent::InstanceAdded(instance));
            report.added += 1;
        }

        Ok(())
    }

    /// Drop assignments whose files no longer exist so they are re-located.
    fn release_vanished_logs(&mut self) {
        let vanished: Vec<(u32, bool, bool)> = self
            .store
            .iter()
            .map(|i| {
                let primary_gone = i.primary_log.as_deref().is_some_and(|p| !p.exists());
                let state_gone = i.state_log.as_deref().is_some_and(|p| !p.exists());
                (i.pid, primary_gone, state_gone)
            })
            .filter(|(_, primary, state)| *primary || *state)
            .collect();

        for (pid, primary_gone, state_gone) in vanished {
            if primary_gone {
                debug!("Primary log for PID {} vanished", pid);
                self.store.release_primary(pid);
            }
            if state_gone {
                debug!("State log for PID {} vanished", pid);
                self.store.release_state_log(pid);
            }
        }
    }

    fn assign_primary_logs(&mut self, report: &mut CycleReport) -> Result<()> {
        let pending: Vec<u32> = self
            .store
            .iter()
            .filter(|i| !i.is_assigned())
            .map(|i| i.pid)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let candidates = self.scan(&self.config.log_dirs)?;
        debug!(
            "{} log candidate(s) for {} unassigned instance(s)",
            candidates.len(),
            pending.len()
        );

        for pid in pending {
            let Some(start_time) = self.store.get(pid).map(|i| i.start_time) else {
                continue;
            };
            let excluded = self.store.assigned_logs(Some(pid));

            let Some(found) = self.locator.locate(pid, start_time, &candidates, &excluded) else {
                if self.unplaced.insert(pid) {
                    info!("No log found yet for PID {}, will keep looking", pid);
                    self.status(format!("No log found yet for PID {}", pid));
                } else {
                    debug!("Still no log for PID {}", pid);
                }
                continue;
            };

            if self.store.assign_primary(pid, &found) {
                self.unplaced.remove(&pid);
                info!(
                    "Assigned {} to PID {} ({})",
                    found.path.display(),
                    pid,
                    found.describe()
                );
                self.status(format!("Assigned log to PID {} ({})", pid, found.describe()));
                report.assigned += 1;
            }
        }

        Ok(())
    }

    fn assign_state_logs(&mut self) -> Result<()> {
        let pending: Vec<_> = self
            .store
            .iter()
            .filter(|i| i.state_log.is_none())
            .filter_map(|i| i.start_time.map(|t| (i.pid, t)))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let candidates = self.scan(&self.config.state_log_dirs)?;

        for (pid, start_time) in pending {
            let excluded = self.store.assigned_logs(Some(pid));
            if let Some(found) = self.locator.locate_state_log(start_time, &candidates, &excluded)
                && self.store.assign_state_log(pid, &found.path)
            {
                debug!(
                    "State log for PID {}: {} ({})",
                    pid,
                    found.path.display(),
                    found.describe()
                );
            }
        }

        Ok(())
    }

    fn scan(&self, dirs: &[PathBuf]) -> Result<Vec<LogCandidate>> {
        scan_log_dirs(dirs, &self.config.log_extension)
    }

    /// Resolve the username when it is unknown or the primary log is new.
    fn resolve_identity(&mut self, pid: u32) -> Result<()> {
        let Some(instance) = self.store.get(pid) else {
            return Ok(());
        };
        if instance.username.is_some() && instance.primary_cursor > 0 {
            return Ok(());
        }

        let primary = instance.primary_log.clone();
        let start_time = instance.start_time;
        let had_username = instance.username.is_some();

        if let Some(path) = primary {
            let name = self.username_from(&path);
            let len = file_len(&path)?.unwrap_or(0);
            // A non-zero cursor marks the identity attempt as done
            self.store.set_primary_cursor(pid, len.max(1));

            if let Some(name) = name {
                self.record_username(pid, &name);
                return Ok(());
            }
        }

        if had_username {
            return Ok(());
        }
        let Some(start_time) = start_time else {
            return Ok(());
        };

        let candidates = self.scan(&self.config.state_log_dirs)?;
        let excluded = self.store.assigned_logs(Some(pid));
        let nearby: Vec<PathBuf> = self
            .locator
            .within_window(start_time, &candidates, &excluded)
            .into_iter()
            .take(self.config.identity_fallback_candidates)
            .map(|(candidate, _)| candidate.path.clone())
            .collect();

        for path in nearby {
            let Some(name) = self.username_from(&path) else {
                continue;
            };

            self.record_username(pid, &name);
            let has_state_log = self.store.get(pid).is_some_and(|i| i.state_log.is_some());
            if !has_state_log {
                self.store.assign_state_log(pid, &path);
            }

            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            self.status(format!("Found username {} from log: {}", name, file_name));
            break;
        }

        Ok(())
    }

    fn username_from(&self, path: &Path) -> Option<String> {
        match read_prefix(path, self.config.identity_prefix_bytes) {
            Ok(content) => resolve_username(&content),
            Err(e) => {
                debug!("Username read skipped {}: {}", path.display(), e);
                None
            }
        }
    }

    fn record_username(&mut self, pid: u32, name: &str) {
        if !self.store.set_username(pid, name) {
            return;
        }
        info!("PID {} is {}", pid, name);
        if let Some(instance) = self.store.get(pid) {
            self.events.emit(EngineEvent::UsernameResolved(instance.clone()));
        }
    }

    /// Read new lines from the state log and apply what they contain.
    fn update_state(&mut self, pid: u32) -> Result<()> {
        let Some(instance) = self.store.get(pid) else {
            return Ok(());
        };
        let Some(target) = instance.state_target().map(Path::to_path_buf) else {
            return Ok(());
        };

        let cursor = if instance.state_source.as_deref() == Some(target.as_path()) {
            instance.state_cursor
        } else {
            0
        };

        // Vanished files are released at the start of the next cycle
        let Some(len) = file_len(&target)? else {
            return Ok(());
        };
        if cursor > 0 && len == cursor {
            debug!("{} unchanged", target.display());
            return Ok(());
        }
        let start = if len < cursor {
            debug!("{} shrank, rescanning from the start", target.display());
            0
        } else {
            cursor
        };

        let tail = match snapshot_tail(&target, self.config.tail_lines, start) {
            Ok(tail) => tail,
            Err(e) => {
                debug!("Snapshot of {} failed: {}", target.display(), e);
                return Ok(());
            }
        };
        self.store.set_state_cursor(pid, &target, tail.end_offset);
        if tail.lines.is_empty() {
            return Ok(());
        }

        let Some(instance) = self.store.get(pid) else {
            return Ok(());
        };
        let result = self.extractor.extract(instance, &tail.lines);
        if result.is_empty() {
            return Ok(());
        }

        let changes = self.store.apply(pid, &result, Utc::now());
        self.publish(pid, changes);
        Ok(())
    }

    fn publish(&self, pid: u32, changes: Vec<InstanceChange>) {
        let Some(instance) = self.store.get(pid) else {
            return;
        };

        for change in changes {
            match change {
                InstanceChange::StateChanged => {
                    let label = instance.biome_label.as_deref().unwrap_or("Unknown");
                    self.status(format!("{}: biome is now {}", instance.display_name, label));
                    self.events.emit(EngineEvent::StateChanged(instance.clone()));
                }
                InstanceChange::AuraChanged => {
                    debug!("{}: aura {:?}", instance.display_name, instance.aura);
                    self.events.emit(EngineEvent::AuraChanged(instance.clone()));
                }
                InstanceChange::TransientFired(hit) => {
                    self.status(format!(
                        "{} detected ({}): {}",
                        hit.kind, hit.tier, instance.display_name
                    ));
                    self.events.emit(EngineEvent::TransientEventFired {
                        instance: instance.clone(),
                        event: hit,
                    });
                }
            }
        }
    }
}

/// File size, or `None` when the file does not exist.
fn file_len(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
