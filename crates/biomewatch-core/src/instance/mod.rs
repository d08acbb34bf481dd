//! Per-process records and the store that owns them.

mod store;
mod tracked;

pub use store::{InstanceChange, InstanceStore};
pub use tracked::{TrackedInstance, TransientFlag};
