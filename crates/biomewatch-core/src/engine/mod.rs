//! Detection engine: the periodic cycle that ties every component together.
//!
//! Each cycle runs process refresh, log assignment, identity resolution and
//! state extraction in that order. Failures are contained per phase and
//! reported through [`CycleReport`] and the event channel; nothing here is
//! fatal.

mod cycle;
mod events;
mod shutdown;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info};

use crate::biome::BiomeTable;
use crate::config::DetectionConfig;
use crate::extract::StateExtractor;
use crate::instance::{InstanceStore, TrackedInstance};
use crate::logs::{LocatorSettings, LogLocator};
use crate::process::{ProcessProvider, ProcessRegistry};

pub use events::{EngineEvent, EventReceiver, EventSink};
pub use shutdown::ShutdownSignal;

/// Outcome of one detection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub added: usize,
    pub removed: usize,
    pub assigned: usize,
    pub failures: usize,
}

impl CycleReport {
    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }
}

pub struct Engine<P: ProcessProvider> {
    config: DetectionConfig,
    registry: ProcessRegistry<P>,
    locator: LogLocator,
    extractor: StateExtractor,
    store: InstanceStore,
    events: EventSink,
    /// Pids already told that no log was found
    unplaced: HashSet<u32>,
}

impl<P: ProcessProvider> Engine<P> {
    pub fn new(
        config: DetectionConfig,
        provider: P,
        table: Arc<BiomeTable>,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = EventSink::channel();
        let engine = Self {
            registry: ProcessRegistry::new(provider, config.process_names.clone()),
            locator: LogLocator::new(LocatorSettings::from(&config)),
            extractor: StateExtractor::new(table),
            store: InstanceStore::new(),
            events,
            unplaced: HashSet::new(),
            config,
        };
        (engine, receiver)
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    /// Cloned records of every tracked instance
    pub fn instances(&self) -> Vec<TrackedInstance> {
        self.store.snapshot()
    }

    /// Run cycles until `shutdown` fires. The in-flight cycle always finishes.
    pub fn run(&mut self, shutdown: &ShutdownSignal) {
        info!(
            "Detection started (interval {}ms, {} log dir(s))",
            self.config.poll_interval_ms,
            self.config.log_dirs.len()
        );
        self.events.status("Detection started");

        while !shutdown.is_shutdown() {
            let report = self.run_cycle();

            let delay = if report.has_failures() {
                error!("Detection cycle had {} failure(s), backing off", report.failures);
                self.config.error_backoff()
            } else {
                self.config.poll_interval()
            };

            if shutdown.wait(delay) {
                break;
            }
        }

        info!("Detection stopped");
        self.events.status("Detection stopped");
    }
}
