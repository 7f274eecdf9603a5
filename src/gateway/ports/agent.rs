//! Port for the agents deployed next to each namespace.

use crate::error::ErrorCode;
use crate::gateway::domain::{AgentNamespaces, ServiceList, ServiceName};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for agent gateway operations.
pub type AgentGatewayResult<T> = Result<T, AgentGatewayError>;

/// Calls served by a remote agent. Every call names the agent by its base URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Lists the namespaces visible to the agent.
    ///
    /// An agent that does not know the endpoint yields an empty listing.
    async fn list_namespaces(&self, agent_url: &str) -> AgentGatewayResult<AgentNamespaces>;

    /// Lists the names of the services deployed in `namespace`.
    async fn list_service_names(
        &self,
        agent_url: &str,
        namespace: &str,
    ) -> AgentGatewayResult<Vec<ServiceName>>;

    /// Triggers discovery of `namespace` on behalf of `workspace_id`.
    async fn start_discovery(
        &self,
        agent_url: &str,
        namespace: &str,
        workspace_id: &str,
        fail_on_error: bool,
    ) -> AgentGatewayResult<()>;

    /// Returns the services discovered so far and the discovery progress.
    async fn list_services(
        &self,
        agent_url: &str,
        namespace: &str,
        workspace_id: &str,
    ) -> AgentGatewayResult<ServiceList>;

    /// Fetches the raw bytes of one specification document.
    async fn fetch_specification(
        &self,
        agent_url: &str,
        namespace: &str,
        workspace_id: &str,
        service_id: &str,
        file_id: &str,
    ) -> AgentGatewayResult<Vec<u8>>;

    /// Relays a body-less request to a service through the agent proxy and
    /// returns the status code it answered with.
    async fn probe_endpoint(
        &self,
        agent_url: &str,
        namespace: &str,
        service_id: &str,
        method: &str,
        path: &str,
    ) -> AgentGatewayResult<u16>;
}

/// Errors returned by agent gateway implementations.
#[derive(Debug, Clone, Error)]
pub enum AgentGatewayError {
    /// The agent rejected the configured credentials.
    #[error("agent rejected credentials with status {0}")]
    Unauthorized(u16),

    /// The agent does not serve the requested specification.
    #[error("failed to get service specification: {0}")]
    SpecificationNotFound(String),

    /// The agent answered with an unexpected status.
    #[error("{message}: status code {status}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// What was being attempted, plus the body when available.
        message: String,
    },

    /// The agent proxy reported a failure relaying the request.
    #[error("Agent proxy failed: {0}")]
    Proxy(String),

    /// The request did not reach the agent or its answer was unreadable.
    #[error("agent transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl AgentGatewayError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Returns the caller-facing code, if the failure has one.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Unauthorized(_) => Some(ErrorCode::NoCatalogAccess),
            _ => None,
        }
    }
}
