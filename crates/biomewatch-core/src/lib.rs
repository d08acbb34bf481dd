pub mod biome;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod instance;
pub mod logs;
pub mod process;

pub use biome::{BiomeMetadata, BiomeTable, BiomeType};
pub use config::DetectionConfig;
pub use engine::{CycleReport, Engine, EngineEvent, EventReceiver, EventSink, ShutdownSignal};
pub use error::{Error, Result};
pub use extract::{
    EventDetail, ExtractionResult, MatchTier, StateExtractor, StateMatch, TransientHit,
    TransientKind, resolve_username,
};
pub use instance::{InstanceChange, InstanceStore, TrackedInstance, TransientFlag};
pub use logs::{AssignmentMethod, LogCandidate, LogLocator, LogMatch};
pub use process::{
    MockProcessProvider, ProcessDescriptor, ProcessProvider, ProcessRegistry,
    SystemProcessProvider,
};
