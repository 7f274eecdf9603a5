//! `reqwest` adapters speaking the agent and catalog wire protocols.

mod agent;
mod catalog;

pub use agent::HttpAgentGateway;
pub use catalog::HttpCatalogGateway;

use std::borrow::Cow;

/// Header carrying the control plane's api key on ordinary calls.
const API_KEY_HEADER: &str = "api-key";

/// Escapes one path segment.
fn segment(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Appends the response body to `message` when there is one.
fn with_body(message: String, body: &str) -> String {
    if body.trim().is_empty() {
        message
    } else {
        format!("{message} ({})", body.trim())
    }
}
