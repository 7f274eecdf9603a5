//! Identifier type for registered agents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registered agent.
///
/// Derived from the deployment coordinates as `lower(cloud)_lower(namespace)`
/// so that a restarted agent lands on the same registry row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds the identifier for an agent deployed in `namespace` of `cloud`.
    #[must_use]
    pub fn from_deployment(cloud: &str, namespace: &str) -> Self {
        Self(format!(
            "{}_{}",
            cloud.to_lowercase(),
            namespace.to_lowercase()
        ))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
