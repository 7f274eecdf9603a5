//! Registry of remote agents.
//!
//! Agents announce themselves with periodic heartbeats. The registry keeps
//! the last heartbeat per agent and derives activity from it, so callers can
//! refuse to drive agents that went quiet or never reported a version.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
