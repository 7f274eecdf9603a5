//! Errors of the snapshot service.

use crate::error::ErrorCode;
use crate::gateway::domain::DiscoveryStatus;
use crate::gateway::ports::{AgentGatewayError, CatalogGatewayError};
use crate::hierarchy::services::ProvisionError;
use crate::snapshot::domain::InvalidVersionName;
use thiserror::Error;

/// Service-level errors for snapshot operations.
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    /// The workspace could not be looked up.
    #[error("failed to get workspace by id: {0}")]
    WorkspaceLookup(CatalogGatewayError),
    /// The workspace does not exist or is not a workspace.
    #[error("Workspace '{0}' not found")]
    WorkspaceNotFound(String),
    /// The version label is not allowed.
    #[error(transparent)]
    InvalidVersion(#[from] InvalidVersionName),
    /// An agent call failed.
    #[error(transparent)]
    Agent(#[from] AgentGatewayError),
    /// A catalog call failed.
    #[error(transparent)]
    Catalog(#[from] CatalogGatewayError),
    /// Discovery has not completed for the namespace.
    #[error("unable to create snapshot since service discovery status is {0}")]
    DiscoveryIncomplete(DiscoveryStatus),
    /// No service survived filtering.
    #[error("create snapshot failed: no (selected) services in namespace {0}, try to run discovery")]
    NoServices(String),
    /// The snapshot tree could not be provisioned.
    #[error("prepare snapshot failed: {0}")]
    Prepare(#[from] ProvisionError),
    /// Reading the services of a snapshot failed.
    #[error("failed to get snapshot with errors: [{}]", .0.join(", "))]
    Read(Vec<String>),
}

impl SnapshotError {
    /// Returns the caller-facing code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::WorkspaceNotFound(_) => Some(ErrorCode::WorkspaceNotFound),
            Self::InvalidVersion(_) => Some(ErrorCode::VersionNameNotAllowed),
            Self::Agent(err) => err.code(),
            Self::Catalog(err) | Self::WorkspaceLookup(err) => err.code(),
            Self::Prepare(err) => err.code(),
            Self::DiscoveryIncomplete(_) | Self::NoServices(_) | Self::Read(_) => None,
        }
    }
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
