use serde::Serialize;
use tokio::sync::mpsc;

use crate::extract::TransientHit;
use crate::instance::TrackedInstance;

/// Notifications published by the detection engine.
///
/// Instance-bearing variants carry a snapshot taken when the event fired.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    InstanceAdded(TrackedInstance),
    InstanceRemoved(TrackedInstance),
    StateChanged(TrackedInstance),
    AuraChanged(TrackedInstance),
    UsernameResolved(TrackedInstance),
    TransientEventFired {
        instance: TrackedInstance,
        event: TransientHit,
    },
    Status(String),
    Error(String),
}

impl EngineEvent {
    /// The instance this event is about, if any
    pub fn instance(&self) -> Option<&TrackedInstance> {
        match self {
            EngineEvent::InstanceAdded(i)
            | EngineEvent::InstanceRemoved(i)
            | EngineEvent::StateChanged(i)
            | EngineEvent::AuraChanged(i)
            | EngineEvent::UsernameResolved(i) => Some(i),
            EngineEvent::TransientEventFired { instance, .. } => Some(instance),
            EngineEvent::Status(_) | EngineEvent::Error(_) => None,
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Sending half of the event channel. Never blocks.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish an event. A closed receiver is ignored.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(EngineEvent::Status(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(EngineEvent::Error(message.into()));
    }
}
