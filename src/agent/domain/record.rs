//! Agent registration record and heartbeat payload.

use super::{ActivityWindow, AgentDomainError, AgentId, AgentStatus};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Heartbeat payload sent by a running agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHeartbeat {
    /// Cloud the agent is deployed in.
    pub cloud: String,
    /// Namespace the agent is deployed in.
    pub namespace: String,
    /// Base URL the control plane uses to reach the agent.
    pub url: String,
    /// Version of the agent backend component.
    pub backend_version: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Version of the agent itself. Agents that never report one cannot be
    /// driven by the control plane.
    #[serde(default)]
    pub agent_version: Option<String>,
}

impl AgentHeartbeat {
    /// Creates a heartbeat carrying the mandatory fields.
    #[must_use]
    pub fn new(
        cloud: impl Into<String>,
        namespace: impl Into<String>,
        url: impl Into<String>,
        backend_version: impl Into<String>,
    ) -> Self {
        Self {
            cloud: cloud.into(),
            namespace: namespace.into(),
            url: url.into(),
            backend_version: backend_version.into(),
            name: None,
            agent_version: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the agent version.
    #[must_use]
    pub fn with_agent_version(mut self, version: impl Into<String>) -> Self {
        self.agent_version = Some(version.into());
        self
    }
}

/// Registry entry for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    id: AgentId,
    cloud: String,
    namespace: String,
    url: String,
    backend_version: String,
    name: Option<String>,
    agent_version: Option<String>,
    last_active: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted agent record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAgentData {
    /// Persisted identifier.
    pub id: AgentId,
    /// Persisted deployment cloud.
    pub cloud: String,
    /// Persisted deployment namespace.
    pub namespace: String,
    /// Persisted agent URL.
    pub url: String,
    /// Persisted backend version.
    pub backend_version: String,
    /// Persisted display name.
    pub name: Option<String>,
    /// Persisted agent version.
    pub agent_version: Option<String>,
    /// Persisted heartbeat timestamp.
    pub last_active: DateTime<Utc>,
}

/// An agent record paired with its activity at observation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInstance {
    /// The registry entry.
    pub record: AgentRecord,
    /// Activity derived from the heartbeat age.
    pub status: AgentStatus,
}

impl AgentRecord {
    /// Validates a heartbeat and stamps it with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDomainError`] when a mandatory field is blank or the URL
    /// is not HTTP(S).
    pub fn from_heartbeat(
        heartbeat: AgentHeartbeat,
        clock: &impl Clock,
    ) -> Result<Self, AgentDomainError> {
        let AgentHeartbeat {
            cloud,
            namespace,
            url,
            backend_version,
            name,
            agent_version,
        } = heartbeat;

        let cloud = non_blank(cloud, AgentDomainError::EmptyCloud)?;
        let namespace = non_blank(namespace, AgentDomainError::EmptyNamespace)?;
        let url = non_blank(url, AgentDomainError::EmptyUrl)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AgentDomainError::InvalidUrl(url));
        }
        let backend_version = non_blank(backend_version, AgentDomainError::EmptyBackendVersion)?;

        Ok(Self {
            id: AgentId::from_deployment(&cloud, &namespace),
            cloud,
            namespace,
            url: url.trim_end_matches('/').to_owned(),
            backend_version,
            name: name.filter(|value| !value.trim().is_empty()),
            agent_version: agent_version.filter(|value| !value.trim().is_empty()),
            last_active: clock.utc(),
        })
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedAgentData) -> Self {
        Self {
            id: data.id,
            cloud: data.cloud,
            namespace: data.namespace,
            url: data.url,
            backend_version: data.backend_version,
            name: data.name,
            agent_version: data.agent_version,
            last_active: data.last_active,
        }
    }

    /// Returns the agent identifier.
    #[must_use]
    pub const fn id(&self) -> &AgentId {
        &self.id
    }

    /// Returns the deployment cloud.
    #[must_use]
    pub fn cloud(&self) -> &str {
        &self.cloud
    }

    /// Returns the deployment namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the agent base URL without a trailing slash.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the backend version.
    #[must_use]
    pub fn backend_version(&self) -> &str {
        &self.backend_version
    }

    /// Returns the explicit display name, if one was reported.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the reported agent version.
    #[must_use]
    pub fn agent_version(&self) -> Option<&str> {
        self.agent_version.as_deref()
    }

    /// Returns the last heartbeat timestamp.
    #[must_use]
    pub const fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Returns the display name, defaulting to `<namespace>.<cloud>`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.namespace, self.cloud))
    }

    /// Returns whether the agent reported a version the control plane can
    /// drive.
    #[must_use]
    pub const fn is_compatible(&self) -> bool {
        self.agent_version.is_some()
    }

    /// Derives activity at `now` given the activity `window`.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>, window: ActivityWindow) -> AgentStatus {
        window.status_of(self.last_active, now)
    }

    /// Pairs the record with its activity at `now`.
    #[must_use]
    pub fn observe(self, now: DateTime<Utc>, window: ActivityWindow) -> AgentInstance {
        let status = self.status_at(now, window);
        AgentInstance {
            record: self,
            status,
        }
    }
}

fn non_blank(value: String, err: AgentDomainError) -> Result<String, AgentDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_owned())
}
