//! Service layer for discovery.

mod discovery;

pub use discovery::{DiscoveryError, DiscoveryResult, DiscoveryService};
