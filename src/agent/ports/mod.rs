//! Port contracts for the agent registry.

pub mod registry;

pub use registry::{AgentRegistryError, AgentRegistryRepository, AgentRegistryResult};
