//! Control plane for API catalog discovery agents.
//!
//! Agents run inside application clusters, discover the services of a
//! namespace and serve their specifications. This crate keeps track of
//! those agents, publishes namespace snapshots into the API catalog, and
//! audits whether published operations reject unauthenticated calls.
//!
//! # Architecture
//!
//! Each capability follows the same hexagonal layout:
//!
//! - **Domain**: pure values and rules with no infrastructure dependencies
//! - **Ports**: async traits for storage and upstream calls
//! - **Adapters**: in-memory, `PostgreSQL` and HTTP implementations of ports
//!
//! # Modules
//!
//! - [`agent`]: heartbeat registry and agent usability checks
//! - [`gateway`]: ports and adapters for agents and the catalog
//! - [`hierarchy`]: package id arithmetic, structure replication, snapshot trees
//! - [`discovery`]: validated discovery triggers and service listings
//! - [`snapshot`]: snapshot creation, background publication and reads
//! - [`security_check`]: security audit pipeline and its reports
//! - [`config`], [`telemetry`], [`error`], [`supervisor`]: shared plumbing

pub mod agent;
pub mod config;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod hierarchy;
pub mod security_check;
pub mod snapshot;
pub mod supervisor;
pub mod telemetry;
