//! REST operations published to the catalog, with a typed view of the
//! security requirements their `OpenAPI` fragment declares.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One security requirement object: scheme name to required scopes.
pub type SecurityRequirement = BTreeMap<String, serde_json::Value>;

/// The slice of an operation object this crate reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationObject {
    /// Operation-level requirements. `Some(vec![])` explicitly disables
    /// security for the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Operations of one path, keyed by HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// `GET` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<OperationObject>,
    /// `PUT` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<OperationObject>,
    /// `POST` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<OperationObject>,
    /// `DELETE` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<OperationObject>,
    /// `OPTIONS` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OperationObject>,
    /// `HEAD` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<OperationObject>,
    /// `PATCH` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<OperationObject>,
    /// `TRACE` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<OperationObject>,
}

impl PathItem {
    /// Returns the operation for `method`, matched case insensitively.
    #[must_use]
    pub fn operation(&self, method: &str) -> Option<&OperationObject> {
        let slot = match method.to_ascii_lowercase().as_str() {
            "get" => &self.get,
            "put" => &self.put,
            "post" => &self.post,
            "delete" => &self.delete,
            "options" => &self.options,
            "head" => &self.head,
            "patch" => &self.patch,
            "trace" => &self.trace,
            _ => return None,
        };
        slot.as_ref()
    }
}

/// Partial `OpenAPI` document attached to a single REST operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationDocument {
    /// Document-level default requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
    /// Paths of the fragment. Only the first one is consulted.
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
}

impl OperationDocument {
    /// Returns the scheme names that guard `method`.
    ///
    /// An operation-level `security` key replaces the document default,
    /// even when it is an empty list.
    #[must_use]
    pub fn effective_security(&self, method: &str) -> BTreeSet<String> {
        let operation_level = self
            .paths
            .values()
            .next()
            .and_then(|item| item.operation(method))
            .and_then(|operation| operation.security.as_ref());
        operation_level
            .or(self.security.as_ref())
            .map(|requirements| scheme_names(requirements))
            .unwrap_or_default()
    }
}

fn scheme_names(requirements: &[SecurityRequirement]) -> BTreeSet<String> {
    requirements
        .iter()
        .flat_map(|requirement| requirement.keys().cloned())
        .collect()
}

/// A REST operation of a published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestOperation {
    /// Catalog operation id.
    pub operation_id: String,
    /// Operation title.
    #[serde(default)]
    pub title: String,
    /// API type, `rest` for every operation returned here.
    #[serde(default)]
    pub api_type: String,
    /// Path template.
    pub path: String,
    /// HTTP method in lower case.
    pub method: String,
    /// Document fragment describing the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<OperationDocument>,
}

impl RestOperation {
    /// Returns the scheme names that guard this operation.
    #[must_use]
    pub fn security_schemes(&self) -> BTreeSet<String> {
        self.data
            .as_ref()
            .map(|document| document.effective_security(&self.method))
            .unwrap_or_default()
    }
}
