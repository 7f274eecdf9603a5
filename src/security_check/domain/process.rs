//! Security check process records and their derived progress.

use super::{ProcessId, ProcessStatus};
use crate::agent::domain::AgentId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a process runs: the agent, the namespace it inspects, and the
/// workspace its snapshot lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessScope {
    /// Agent serving the namespace.
    pub agent_id: AgentId,
    /// Inspected namespace.
    pub namespace: String,
    /// Workspace receiving the audit snapshot.
    pub workspace_id: String,
    /// Cloud the namespace runs in.
    pub cloud_name: String,
}

/// One security check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityCheckProcess {
    /// Process identifier.
    pub process_id: ProcessId,
    /// Inspected deployment.
    pub scope: ProcessScope,
    /// Lifecycle status.
    pub status: ProcessStatus,
    /// Free-text outcome details.
    pub details: String,
    /// When the check was requested.
    pub started_at: DateTime<Utc>,
    /// Principal that requested the check.
    pub started_by: String,
    /// When the process reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl SecurityCheckProcess {
    /// Creates a running process with a fresh identifier.
    #[must_use]
    pub fn start(scope: ProcessScope, started_by: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            process_id: ProcessId::new(),
            scope,
            status: ProcessStatus::Running,
            details: String::new(),
            started_at: now,
            started_by: started_by.into(),
            finished_at: None,
        }
    }

    /// Moves the process to `status`, stamping the finish time when the
    /// status is terminal.
    pub fn transition(&mut self, status: ProcessStatus, details: impl Into<String>, now: DateTime<Utc>) {
        self.status = status;
        self.details = details.into();
        self.finished_at = status.is_terminal().then_some(now);
    }
}

/// A process together with the counts derived from its service rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    /// The process record.
    pub process: SecurityCheckProcess,
    /// Service rows in a terminal status: `complete`, `error`, and also
    /// `failed`. Counting `failed` keeps this equal to `services_total` once
    /// the process itself is terminal, since a service whose publication
    /// failed is never checked afterwards.
    pub services_processed: u64,
    /// Every service row of the process.
    pub services_total: u64,
}

impl ProcessSummary {
    /// Returns the status view of this summary.
    #[must_use]
    pub fn progress(&self) -> ProcessProgress {
        ProcessProgress {
            status: self.process.status,
            details: self.process.details.clone(),
            services_processed: self.services_processed,
            services_total: self.services_total,
        }
    }
}

/// Status of a process as returned to callers polling it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessProgress {
    /// Lifecycle status.
    pub status: ProcessStatus,
    /// Free-text outcome details.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub details: String,
    /// Service rows in a terminal status.
    pub services_processed: u64,
    /// Every service row of the process.
    pub services_total: u64,
}
