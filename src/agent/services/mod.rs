//! Service layer for the agent registry.

mod registry;

pub use registry::{AgentRegistryService, AgentRegistryServiceError, AgentRegistryServiceResult};
