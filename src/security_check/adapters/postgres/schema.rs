//! Diesel schema for security check persistence.

diesel::table! {
    /// One row per security check run.
    security_check_processes (process_id) {
        /// Process identifier.
        process_id -> Uuid,
        /// Agent serving the namespace.
        agent_id -> Varchar,
        /// Inspected namespace.
        namespace -> Varchar,
        /// Workspace receiving the audit snapshot.
        workspace_id -> Varchar,
        /// Cloud the namespace runs in.
        cloud_name -> Varchar,
        /// Lifecycle status.
        status -> Varchar,
        /// Outcome details.
        details -> Text,
        /// Request time.
        started_at -> Timestamptz,
        /// Requesting principal.
        started_by -> Varchar,
        /// Time the process reached a terminal status.
        finished_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Progress of every discovered service of a process.
    security_check_services (process_id, service_id) {
        /// Owning process.
        process_id -> Uuid,
        /// Discovered service id.
        service_id -> Varchar,
        /// Catalog base URL.
        apihub_url -> Varchar,
        /// Published package.
        package_id -> Varchar,
        /// Published version.
        version -> Varchar,
        /// Probed endpoints.
        endpoints_total -> Int4,
        /// Endpoints answering differently than expected.
        endpoints_failed -> Int4,
        /// Lifecycle status.
        status -> Varchar,
        /// Outcome details.
        details -> Text,
    }
}

diesel::table! {
    /// Probe outcome of every operation of a service.
    security_check_results (process_id, service_id, method, path) {
        /// Owning process.
        process_id -> Uuid,
        /// Probed service.
        service_id -> Varchar,
        /// HTTP method.
        method -> Varchar,
        /// Path template.
        path -> Varchar,
        /// Security schemes guarding the operation.
        security -> Array<Text>,
        /// Free-text detail.
        details -> Text,
        /// Status the endpoint answered with.
        actual_response_code -> Nullable<Int4>,
        /// Status expected from the endpoint.
        expected_response_code -> Nullable<Int4>,
    }
}
