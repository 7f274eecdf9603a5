//! Errors surfaced to callers of the security check services.

use crate::discovery::services::DiscoveryError;
use crate::error::ErrorCode;
use crate::security_check::domain::ProcessId;
use crate::security_check::ports::AuditRepositoryError;
use thiserror::Error;

/// Result type for security check service operations.
pub type SecurityCheckResult<T> = Result<T, SecurityCheckError>;

/// Failures of starting a check or reading its outcome.
///
/// Failures inside a running pipeline are never returned; they are recorded
/// on the process and its services.
#[derive(Debug, Error)]
pub enum SecurityCheckError {
    /// The agent, namespace or workspace failed validation.
    #[error(transparent)]
    Target(#[from] DiscoveryError),

    /// The process could not be stored.
    #[error("failed to store security check process entity: {0}")]
    Store(AuditRepositoryError),

    /// Reading persisted rows failed.
    #[error(transparent)]
    Repository(#[from] AuditRepositoryError),

    /// No process has the requested id.
    #[error("security check process {0} not found")]
    NotFound(ProcessId),
}

impl SecurityCheckError {
    /// Returns the caller-facing error code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Target(err) => err.code(),
            Self::NotFound(_) => Some(ErrorCode::SecurityCheckNotFound),
            Self::Store(_) | Self::Repository(_) => None,
        }
    }
}
