//! Typed settings for the control plane.
//!
//! Settings are read from an optional TOML file; every field has a default so
//! an empty document is valid. Durations are written as integer milliseconds
//! in files and exposed as [`Duration`] to the services.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Alias of the group that holds snapshot trees inside a workspace.
pub const DEFAULT_SNAPSHOTS_GROUP_ALIAS: &str = "RUNENV";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The configuration document is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is present but unusable.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Top-level control plane configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Base URL of the catalog service.
    pub catalog_url: String,
    /// API key sent to the catalog for system calls.
    pub catalog_api_key: String,
    /// API key sent to agents for system calls.
    pub agent_api_key: String,
    /// Workspace whose package structure is mirrored into other workspaces
    /// before discovery.
    pub default_workspace_id: Option<String>,
    /// Alias of the group that holds snapshot trees.
    pub snapshots_group_alias: String,
    /// Window after the last heartbeat during which an agent counts as active.
    pub agent_activity_window_ms: u64,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout_ms: u64,
    /// `PostgreSQL` connection URL used by the persistence adapters.
    pub database_url: Option<String>,
    /// Security audit tuning.
    pub audit: AuditConfig,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            catalog_url: "http://localhost:8090".to_owned(),
            catalog_api_key: String::new(),
            agent_api_key: String::new(),
            default_workspace_id: None,
            snapshots_group_alias: DEFAULT_SNAPSHOTS_GROUP_ALIAS.to_owned(),
            agent_activity_window_ms: 30_000,
            http_timeout_ms: 30_000,
            database_url: None,
            audit: AuditConfig::default(),
        }
    }
}

/// Polling, deadline, and pool settings for the security audit pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Sleep between discovery status polls.
    pub discovery_poll_interval_ms: u64,
    /// Deadline for discovery to reach a terminal status.
    pub discovery_deadline_ms: u64,
    /// Sleep between publish status polls.
    pub publish_poll_interval_ms: u64,
    /// Deadline for every dispatched publish to resolve.
    pub publish_deadline_ms: u64,
    /// Upper bound on concurrent probing workers. Read through
    /// [`AuditConfig::worker_limit`].
    pub max_workers: usize,
    /// Page size used when listing REST operations. Read through
    /// [`AuditConfig::operations_page_limit`].
    pub operations_page_size: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            discovery_poll_interval_ms: 5_000,
            discovery_deadline_ms: 600_000,
            publish_poll_interval_ms: 10_000,
            publish_deadline_ms: 600_000,
            max_workers: 10,
            operations_page_size: 50,
        }
    }
}

impl AuditConfig {
    /// Returns the discovery poll interval.
    #[must_use]
    pub const fn discovery_poll_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_poll_interval_ms)
    }

    /// Returns the discovery deadline.
    #[must_use]
    pub const fn discovery_deadline(&self) -> Duration {
        Duration::from_millis(self.discovery_deadline_ms)
    }

    /// Returns the publish poll interval.
    #[must_use]
    pub const fn publish_poll_interval(&self) -> Duration {
        Duration::from_millis(self.publish_poll_interval_ms)
    }

    /// Returns the publish deadline.
    #[must_use]
    pub const fn publish_deadline(&self) -> Duration {
        Duration::from_millis(self.publish_deadline_ms)
    }

    /// Returns the number of probing workers, never less than one.
    ///
    /// Loaded files reject zero in [`ControlPlaneConfig::validate`]; settings
    /// built in code are clamped here instead.
    #[must_use]
    pub const fn worker_limit(&self) -> usize {
        if self.max_workers == 0 { 1 } else { self.max_workers }
    }

    /// Returns the REST operations page size, never less than one.
    #[must_use]
    pub const fn operations_page_limit(&self) -> u32 {
        if self.operations_page_size == 0 {
            1
        } else {
            self.operations_page_size
        }
    }
}

impl ControlPlaneConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and
    /// [`ConfigError::Invalid`] when a value fails validation.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the errors of [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&document)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "catalog_url",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.snapshots_group_alias.contains('.') {
            return Err(ConfigError::Invalid {
                field: "snapshots_group_alias",
                reason: "must be a single package id segment".to_owned(),
            });
        }
        if self.audit.max_workers == 0 {
            return Err(ConfigError::Invalid {
                field: "audit.max_workers",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.audit.operations_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "audit.operations_page_size",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Returns the agent activity window.
    #[must_use]
    pub const fn agent_activity_window(&self) -> Duration {
        Duration::from_millis(self.agent_activity_window_ms)
    }

    /// Returns the outbound HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Returns the catalog URL without a trailing slash.
    #[must_use]
    pub fn catalog_base_url(&self) -> Arc<str> {
        Arc::from(self.catalog_url.trim_end_matches('/'))
    }
}
