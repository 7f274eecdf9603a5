//! Per-service rows of a security check.

use super::{ProcessId, ServiceStatus};
use serde::Serialize;

/// Details recorded for services without an `OpenAPI` document.
pub const UNSUPPORTED_SERVICE: &str = "unsupported service (no valid openapi specs)";

/// Progress of one discovered service within a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    /// Owning process.
    pub process_id: ProcessId,
    /// Discovered service id.
    pub service_id: String,
    /// Catalog base URL, set once probing starts.
    #[serde(rename = "apihubUrl")]
    pub catalog_url: String,
    /// Package the service was published into.
    pub package_id: String,
    /// Published version.
    pub version: String,
    /// Probed endpoints.
    pub endpoints_total: u32,
    /// Endpoints that answered differently than expected.
    pub endpoints_failed: u32,
    /// Lifecycle status.
    pub status: ServiceStatus,
    /// Free-text outcome details.
    pub details: String,
}

impl ServiceCheck {
    fn with_status(process_id: ProcessId, service_id: &str, status: ServiceStatus, details: &str) -> Self {
        Self {
            process_id,
            service_id: service_id.to_owned(),
            catalog_url: String::new(),
            package_id: String::new(),
            version: String::new(),
            endpoints_total: 0,
            endpoints_failed: 0,
            status,
            details: details.to_owned(),
        }
    }

    /// A service waiting for its publication.
    #[must_use]
    pub fn pending(process_id: ProcessId, service_id: &str) -> Self {
        Self::with_status(process_id, service_id, ServiceStatus::None, "")
    }

    /// A service that cannot be checked for lack of an `OpenAPI` document.
    #[must_use]
    pub fn unsupported(process_id: ProcessId, service_id: &str) -> Self {
        Self::with_status(process_id, service_id, ServiceStatus::Complete, UNSUPPORTED_SERVICE)
    }

    /// A service whose publication or probing could not proceed.
    #[must_use]
    pub fn failed(process_id: ProcessId, service_id: &str, details: &str) -> Self {
        Self::with_status(process_id, service_id, ServiceStatus::Failed, details)
    }

    /// A published service about to be probed.
    #[must_use]
    pub fn probing(
        process_id: ProcessId,
        service_id: &str,
        catalog_url: &str,
        package_id: &str,
        version: &str,
    ) -> Self {
        Self {
            catalog_url: catalog_url.to_owned(),
            package_id: package_id.to_owned(),
            version: version.to_owned(),
            ..Self::with_status(process_id, service_id, ServiceStatus::Running, "")
        }
    }

    /// Moves the row to `status` with `details`.
    pub fn finish(&mut self, status: ServiceStatus, details: impl Into<String>) {
        self.status = status;
        self.details = details.into();
    }
}
