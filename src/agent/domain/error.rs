//! Error types for agent domain validation.

use thiserror::Error;

/// Errors returned while constructing agent domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentDomainError {
    /// The deployment cloud is empty after trimming.
    #[error("agent cloud must not be empty")]
    EmptyCloud,

    /// The deployment namespace is empty after trimming.
    #[error("agent namespace must not be empty")]
    EmptyNamespace,

    /// The agent URL is empty after trimming.
    #[error("agent url must not be empty")]
    EmptyUrl,

    /// The agent URL is not an absolute HTTP(S) URL.
    #[error("agent url '{0}' must start with http:// or https://")]
    InvalidUrl(String),

    /// The backend version is empty after trimming.
    #[error("agent backend version must not be empty")]
    EmptyBackendVersion,
}
