//! Heartbeat intake, agent lookup, and usability checks.

use crate::agent::{
    domain::{
        ActivityWindow, AgentDomainError, AgentHeartbeat, AgentId, AgentInstance, AgentRecord,
        AgentStatus,
    },
    ports::{AgentRegistryError, AgentRegistryRepository},
};
use crate::error::ErrorCode;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Service-level errors for agent registry operations.
#[derive(Debug, Error)]
pub enum AgentRegistryServiceError {
    /// Heartbeat validation failed.
    #[error(transparent)]
    Domain(#[from] AgentDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] AgentRegistryError),
    /// No agent is registered under the id.
    #[error("agent {0} not found")]
    NotFound(AgentId),
    /// The agent has not sent a heartbeat within the activity window.
    #[error("agent {0} is inactive")]
    Inactive(AgentId),
    /// The agent never reported an agent version.
    #[error("agent {0} runs an incompatible version")]
    IncompatibleVersion(AgentId),
}

impl AgentRegistryServiceError {
    /// Returns the caller-facing code, if the failure is a validation error.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::NotFound(_) => Some(ErrorCode::AgentNotFound),
            Self::Inactive(_) => Some(ErrorCode::InactiveAgent),
            Self::IncompatibleVersion(_) => Some(ErrorCode::IncompatibleAgentVersion),
            Self::Domain(_) => Some(ErrorCode::InvalidParameter),
            Self::Repository(_) => None,
        }
    }
}

/// Result type for agent registry service operations.
pub type AgentRegistryServiceResult<T> = Result<T, AgentRegistryServiceError>;

/// Agent registration and lookup service.
#[derive(Clone)]
pub struct AgentRegistryService<R, C>
where
    R: AgentRegistryRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    activity_window: ActivityWindow,
}

impl<R, C> AgentRegistryService<R, C>
where
    R: AgentRegistryRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new registry service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>, activity_window: Duration) -> Self {
        Self {
            repository,
            clock,
            activity_window: ActivityWindow::new(activity_window),
        }
    }

    /// Records a heartbeat, creating the agent on first contact.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryServiceError::Domain`] for malformed heartbeats
    /// or [`AgentRegistryServiceError::Repository`] when persistence fails.
    pub async fn heartbeat(
        &self,
        heartbeat: AgentHeartbeat,
    ) -> AgentRegistryServiceResult<AgentRecord> {
        let record = AgentRecord::from_heartbeat(heartbeat, &*self.clock)?;
        self.repository.upsert(&record).await?;
        debug!(agent_id = %record.id(), "agent heartbeat recorded");
        Ok(record)
    }

    /// Finds an agent and derives its current activity.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryServiceError::Repository`] when lookup fails.
    pub async fn find(&self, id: &AgentId) -> AgentRegistryServiceResult<Option<AgentInstance>> {
        let now = self.clock.utc();
        Ok(self
            .repository
            .find_by_id(id)
            .await?
            .map(|record| record.observe(now, self.activity_window)))
    }

    /// Lists agents ordered by id, optionally only the active ones.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryServiceError::Repository`] when lookup fails.
    pub async fn list(&self, only_active: bool) -> AgentRegistryServiceResult<Vec<AgentInstance>> {
        let now = self.clock.utc();
        let active_since = only_active.then(|| self.activity_window.cutoff(now));
        let records = self.repository.list(active_since).await?;
        Ok(records
            .into_iter()
            .map(|record| record.observe(now, self.activity_window))
            .collect())
    }

    /// Returns the agent when it can be driven by the control plane.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryServiceError::NotFound`],
    /// [`AgentRegistryServiceError::Inactive`], or
    /// [`AgentRegistryServiceError::IncompatibleVersion`] for unusable agents
    /// and [`AgentRegistryServiceError::Repository`] when lookup fails.
    pub async fn resolve_usable(&self, id: &AgentId) -> AgentRegistryServiceResult<AgentRecord> {
        let instance = self
            .find(id)
            .await?
            .ok_or_else(|| AgentRegistryServiceError::NotFound(id.clone()))?;
        if instance.status == AgentStatus::Inactive {
            return Err(AgentRegistryServiceError::Inactive(id.clone()));
        }
        if !instance.record.is_compatible() {
            return Err(AgentRegistryServiceError::IncompatibleVersion(id.clone()));
        }
        Ok(instance.record)
    }
}
