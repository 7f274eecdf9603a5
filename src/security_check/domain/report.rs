//! Read models handed to callers and to the report generator.

use super::{
    EndpointResult, EndpointVerdict, ProcessId, ProcessStatus, ProcessSummary, ServiceCheck,
    ServiceVerdict,
};
use crate::agent::domain::AgentId;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Prefix of principals that are catalog API keys rather than users.
pub const API_KEY_PRINCIPAL_PREFIX: &str = "api-key_";

/// Page size applied when a filter does not set one.
pub const DEFAULT_REPORT_LIMIT: u32 = 100;

/// Returns the version label of an audit snapshot taken at `now`.
///
/// Date parts are not zero padded: `auth_security_check_2026.3.7`.
#[must_use]
pub fn audit_version_label(now: DateTime<Utc>) -> String {
    format!(
        "auth_security_check_{}.{}.{}",
        now.year(),
        now.month(),
        now.day()
    )
}

/// Selection and paging of process summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    /// Only processes run through this agent.
    pub agent_id: Option<AgentId>,
    /// Only processes inspecting this namespace.
    pub namespace: Option<String>,
    /// Only processes publishing into this workspace.
    pub workspace_id: Option<String>,
    /// Zero-based page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            agent_id: None,
            namespace: None,
            workspace_id: None,
            page: 0,
            limit: DEFAULT_REPORT_LIMIT,
        }
    }
}

impl ReportFilter {
    /// Returns the number of summaries skipped before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit)
    }

    /// Returns whether `summary` passes the filter.
    #[must_use]
    pub fn matches(&self, summary: &ProcessSummary) -> bool {
        let scope = &summary.process.scope;
        self.agent_id.as_ref().is_none_or(|id| *id == scope.agent_id)
            && self.namespace.as_ref().is_none_or(|ns| *ns == scope.namespace)
            && self
                .workspace_id
                .as_ref()
                .is_none_or(|ws| *ws == scope.workspace_id)
    }
}

/// Principal that requested a check, resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ReportPrincipal {
    /// A catalog user.
    #[serde(rename = "user", rename_all = "camelCase")]
    User {
        /// User id.
        id: String,
        /// Display name.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Email address.
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        /// Avatar location.
        #[serde(skip_serializing_if = "Option::is_none")]
        avatar_url: Option<String>,
    },
    /// A catalog API key.
    #[serde(rename = "apiKey")]
    ApiKey {
        /// API key id.
        id: String,
        /// API key name.
        name: String,
    },
}

impl ReportPrincipal {
    /// A principal known only by its id.
    #[must_use]
    pub fn unresolved(id: &str) -> Self {
        Self::User {
            id: id.to_owned(),
            name: None,
            email: None,
            avatar_url: None,
        }
    }
}

/// One entry of the report listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckReport {
    /// Process identifier.
    pub process_id: ProcessId,
    /// When the check was requested.
    pub created_at: DateTime<Utc>,
    /// Who requested the check.
    pub created_by: ReportPrincipal,
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

/// A service row with its rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRollup {
    /// The service row.
    #[serde(flatten)]
    pub service: ServiceCheck,
    /// Classification over its endpoints.
    pub verdict: ServiceVerdict,
}

/// An endpoint result with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRollup {
    /// The result row.
    #[serde(flatten)]
    pub result: EndpointResult,
    /// Classification of the result.
    pub verdict: EndpointVerdict,
}

/// Everything a report generator renders for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedReport {
    /// The process with its counts.
    pub summary: ProcessSummary,
    /// Service rows ordered by service id.
    pub services: Vec<ServiceRollup>,
    /// Result rows ordered by service, method, and path.
    pub endpoints: Vec<EndpointRollup>,
}

impl ExportedReport {
    /// Classifies `services` and `results` of the process in `summary`.
    #[must_use]
    pub fn assemble(
        summary: ProcessSummary,
        services: Vec<ServiceCheck>,
        results: Vec<EndpointResult>,
    ) -> Self {
        let service_rollups = services
            .into_iter()
            .map(|service| ServiceRollup {
                verdict: ServiceVerdict::classify(&service, &results),
                service,
            })
            .collect();
        let endpoint_rollups = results
            .into_iter()
            .map(|result| EndpointRollup {
                verdict: result.verdict(),
                result,
            })
            .collect();
        Self {
            summary,
            services: service_rollups,
            endpoints: endpoint_rollups,
        }
    }

    /// Returns whether the process finished, so the report is final.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.summary.process.status.is_terminal()
    }
}
