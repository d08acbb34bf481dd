mod provider;
mod registry;
mod system;

// Mock process provider for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use provider::{ProcessDescriptor, ProcessProvider};
pub use registry::{ProcessDelta, ProcessRegistry};
pub use system::SystemProcessProvider;

#[doc(hidden)]
pub use mock::MockProcessProvider;
