//! Diesel schema for agent registry persistence.

diesel::table! {
    /// Registered agents, one row per deployment.
    agents (agent_id) {
        /// Identifier derived from cloud and namespace.
        agent_id -> Varchar,
        /// Deployment cloud.
        cloud -> Varchar,
        /// Deployment namespace.
        namespace -> Varchar,
        /// Agent base URL.
        url -> Varchar,
        /// Backend component version.
        backend_version -> Varchar,
        /// Optional display name.
        name -> Nullable<Varchar>,
        /// Optional agent version.
        agent_version -> Nullable<Varchar>,
        /// Last heartbeat timestamp.
        last_active -> Timestamptz,
    }
}
