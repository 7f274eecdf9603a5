//! Port contracts for the remote agents and the API catalog.

pub mod agent;
pub mod catalog;

pub use agent::{AgentGateway, AgentGatewayError, AgentGatewayResult};
pub use catalog::{CatalogGateway, CatalogGatewayError, CatalogGatewayResult};

#[cfg(test)]
pub use agent::MockAgentGateway;
#[cfg(test)]
pub use catalog::MockCatalogGateway;
