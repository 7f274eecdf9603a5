//! Repository port for agent registry persistence.

use crate::agent::domain::{AgentId, AgentRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for agent registry operations.
pub type AgentRegistryResult<T> = Result<T, AgentRegistryError>;

/// Agent registry persistence contract.
#[async_trait]
pub trait AgentRegistryRepository: Send + Sync {
    /// Inserts the record or replaces the existing row with the same id.
    async fn upsert(&self, record: &AgentRecord) -> AgentRegistryResult<()>;

    /// Finds an agent by identifier.
    ///
    /// Returns `None` when the agent was never registered.
    async fn find_by_id(&self, id: &AgentId) -> AgentRegistryResult<Option<AgentRecord>>;

    /// Lists agents ordered by identifier.
    ///
    /// When `active_since` is set, only agents whose last heartbeat is at or
    /// after that instant are returned.
    async fn list(
        &self,
        active_since: Option<DateTime<Utc>>,
    ) -> AgentRegistryResult<Vec<AgentRecord>>;
}

/// Errors returned by agent registry repository implementations.
#[derive(Debug, Clone, Error)]
pub enum AgentRegistryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AgentRegistryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
