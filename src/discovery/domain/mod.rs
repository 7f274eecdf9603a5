//! Validated discovery targets.

use crate::agent::domain::AgentRecord;
use crate::gateway::domain::CatalogPackage;

/// An agent, one of its namespaces, and a catalog workspace, all checked to
/// exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTarget {
    /// The usable agent.
    pub agent: AgentRecord,
    /// Namespace visible to the agent.
    pub namespace: String,
    /// The workspace node.
    pub workspace: CatalogPackage,
    /// Cloud reported by the agent, or the one it registered with.
    pub cloud_name: String,
}

impl DiscoveryTarget {
    /// Returns the agent base URL.
    #[must_use]
    pub fn agent_url(&self) -> &str {
        self.agent.url()
    }

    /// Returns the workspace id.
    #[must_use]
    pub fn workspace_id(&self) -> &str {
        &self.workspace.id
    }
}
