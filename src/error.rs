//! Caller-facing error taxonomy.
//!
//! Every validation failure surfaced synchronously to a caller carries one of
//! these codes. The numeric strings are stable and shared with the catalog
//! front end, so they must never be renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes exposed to callers of the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The referenced agent is not registered.
    AgentNotFound,
    /// The referenced agent has not sent a heartbeat recently.
    InactiveAgent,
    /// The referenced agent runs a version the control plane cannot drive.
    IncompatibleAgentVersion,
    /// The catalog rejected the configured credentials.
    NoCatalogAccess,
    /// The referenced workspace does not exist or is not a workspace.
    WorkspaceNotFound,
    /// The namespace is not known to the agent.
    NamespaceNotFound,
    /// The snapshot version label contains a reserved character.
    VersionNameNotAllowed,
    /// A request parameter could not be interpreted.
    InvalidParameter,
    /// No security check exists with the given process id.
    SecurityCheckNotFound,
}

impl ErrorCode {
    /// Returns the stable wire code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgentNotFound => "4",
            Self::InactiveAgent => "5",
            Self::IncompatibleAgentVersion => "6",
            Self::NoCatalogAccess => "7",
            Self::WorkspaceNotFound => "8",
            Self::NamespaceNotFound => "9",
            Self::VersionNameNotAllowed => "10",
            Self::InvalidParameter => "11",
            Self::SecurityCheckNotFound => "16",
        }
    }

    /// Returns the HTTP status a transport layer should answer with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::AgentNotFound
            | Self::WorkspaceNotFound
            | Self::NamespaceNotFound
            | Self::SecurityCheckNotFound => 404,
            Self::InactiveAgent | Self::IncompatibleAgentVersion | Self::NoCatalogAccess => 424,
            Self::VersionNameNotAllowed | Self::InvalidParameter => 400,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
