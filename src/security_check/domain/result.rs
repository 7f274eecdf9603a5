//! Endpoint probe results and their classification.

use super::{ProcessId, ServiceCheck, ServiceStatus};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Status an endpoint guarded by any security scheme must answer with when
/// called without credentials.
pub const UNAUTHORIZED: u16 = 401;

/// Outcome of probing one operation of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResult {
    /// Owning process.
    pub process_id: ProcessId,
    /// Probed service.
    pub service_id: String,
    /// HTTP method, as declared by the operation.
    pub method: String,
    /// Path template.
    pub path: String,
    /// Security schemes guarding the operation.
    pub security: BTreeSet<String>,
    /// Free-text detail, such as a transport error.
    pub details: String,
    /// Status the endpoint answered with.
    pub actual_response_code: Option<u16>,
    /// Status expected from the endpoint, unset when nothing guards it.
    pub expected_response_code: Option<u16>,
}

impl EndpointResult {
    /// Creates an unprobed result, expecting [`UNAUTHORIZED`] when any scheme
    /// guards the operation.
    #[must_use]
    pub fn new(
        process_id: ProcessId,
        service_id: &str,
        method: &str,
        path: &str,
        security: BTreeSet<String>,
    ) -> Self {
        let expected_response_code = (!security.is_empty()).then_some(UNAUTHORIZED);
        Self {
            process_id,
            service_id: service_id.to_owned(),
            method: method.to_owned(),
            path: path.to_owned(),
            security,
            details: String::new(),
            actual_response_code: None,
            expected_response_code,
        }
    }

    /// Returns whether the endpoint had an expectation it did not meet.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.verdict() == EndpointVerdict::NotOk
    }

    /// Classifies the result.
    #[must_use]
    pub fn verdict(&self) -> EndpointVerdict {
        match self.expected_response_code {
            None => EndpointVerdict::Unknown,
            Some(expected) if self.actual_response_code == Some(expected) => EndpointVerdict::Ok,
            Some(_) => EndpointVerdict::NotOk,
        }
    }
}

/// Classification of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EndpointVerdict {
    /// The endpoint answered as expected.
    #[serde(rename = "OK")]
    Ok,
    /// The endpoint answered differently than expected.
    #[serde(rename = "NOT OK")]
    NotOk,
    /// Nothing is known about what the endpoint should answer.
    Unknown,
}

impl EndpointVerdict {
    /// Returns the label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotOk => "NOT OK",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for EndpointVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rollup classification of one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServiceVerdict {
    /// Every guarded endpoint answered as expected.
    #[serde(rename = "OK")]
    Ok,
    /// At least one endpoint answered differently than expected.
    #[serde(rename = "NOT OK")]
    NotOk,
    /// Some endpoints declare no security and need a manual review.
    #[serde(rename = "TO CHECK")]
    ToCheck,
    /// The service was not checked to completion, or it failed.
    Unknown,
}

impl ServiceVerdict {
    /// Rolls up the endpoints of `service` found in `results`.
    ///
    /// Only a `complete` service is rated from its endpoints. Any other
    /// status is `Unknown` whatever the endpoints say, and that includes
    /// `failed`: a service whose publication failed had no endpoint checked, so
    /// rating it `OK` from an empty endpoint list would overstate it.
    /// Mismatches take precedence over unguarded endpoints.
    #[must_use]
    pub fn classify(service: &ServiceCheck, results: &[EndpointResult]) -> Self {
        if service.status != ServiceStatus::Complete {
            return Self::Unknown;
        }
        let mut verdict = Self::Ok;
        for result in results
            .iter()
            .filter(|result| result.service_id == service.service_id)
        {
            match result.verdict() {
                EndpointVerdict::NotOk => return Self::NotOk,
                EndpointVerdict::Unknown => verdict = Self::ToCheck,
                EndpointVerdict::Ok => {}
            }
        }
        verdict
    }

    /// Returns the label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotOk => "NOT OK",
            Self::ToCheck => "TO CHECK",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ServiceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
