//! Catalog principals that can start an audit.

use serde::{Deserialize, Serialize};

/// A catalog user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// User id.
    pub id: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: String,
}

/// A catalog API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyInfo {
    /// Key id.
    pub id: String,
    /// Package the key is scoped to.
    #[serde(default)]
    pub package_id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether the key was revoked.
    #[serde(default)]
    pub revoked: bool,
    /// Roles granted by the key.
    #[serde(default)]
    pub roles: Vec<String>,
}
