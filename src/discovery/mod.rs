//! Service discovery in agent namespaces.
//!
//! Before discovery runs for a workspace other than the configured default
//! one, the package structure documenting the namespace's services is
//! mirrored from the default workspace, so that discovered services find
//! their baselines.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
