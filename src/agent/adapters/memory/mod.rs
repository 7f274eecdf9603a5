//! In-memory agent registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::agent::{
    domain::{AgentId, AgentRecord},
    ports::{AgentRegistryError, AgentRegistryRepository, AgentRegistryResult},
};

/// Thread-safe in-memory agent registry.
///
/// Rows are kept in a [`BTreeMap`] so listings come out ordered by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentRegistry {
    agents: Arc<RwLock<BTreeMap<AgentId, AgentRecord>>>,
}

impl InMemoryAgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRegistryRepository for InMemoryAgentRegistry {
    async fn upsert(&self, record: &AgentRecord) -> AgentRegistryResult<()> {
        let mut agents = self.agents.write().map_err(|err| {
            AgentRegistryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        agents.insert(record.id().clone(), record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &AgentId) -> AgentRegistryResult<Option<AgentRecord>> {
        let agents = self.agents.read().map_err(|err| {
            AgentRegistryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(agents.get(id).cloned())
    }

    async fn list(
        &self,
        active_since: Option<DateTime<Utc>>,
    ) -> AgentRegistryResult<Vec<AgentRecord>> {
        let agents = self.agents.read().map_err(|err| {
            AgentRegistryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(agents
            .values()
            .filter(|record| active_since.is_none_or(|since| record.last_active() >= since))
            .cloned()
            .collect())
    }
}
