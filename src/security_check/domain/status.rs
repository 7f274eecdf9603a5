//! Lifecycle states of processes and of the services they check.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned while parsing a persisted status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown security check status: {0}")]
pub struct ParseCheckStatusError(pub String);

/// Lifecycle of a security check process.
///
/// `running` moves once to either terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// The pipeline is still working.
    Running,
    /// Every service reached a terminal state.
    Complete,
    /// A blocking step failed or a deadline expired.
    Error,
}

impl ProcessStatus {
    /// Returns the canonical text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Returns whether the process finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProcessStatus {
    type Error = ParseCheckStatusError;

    fn try_from(value: &str) -> Result<Self, ParseCheckStatusError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            _ => Err(ParseCheckStatusError(value.to_owned())),
        }
    }
}

/// Lifecycle of one service within a process.
///
/// Moves `none → running → {complete | failed | error}`; the three last
/// states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Waiting for its publication.
    None,
    /// Published and being probed.
    Running,
    /// Probing finished.
    Complete,
    /// Publication or endpoint retrieval failed.
    Failed,
    /// The service could not be checked.
    Error,
}

impl ServiceStatus {
    /// Returns the canonical text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }

    /// Returns whether the service reached a final state. Terminal services,
    /// `failed` included, count toward a process's `servicesProcessed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Error)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceStatus {
    type Error = ParseCheckStatusError;

    fn try_from(value: &str) -> Result<Self, ParseCheckStatusError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            "error" => Ok(Self::Error),
            _ => Err(ParseCheckStatusError(value.to_owned())),
        }
    }
}
