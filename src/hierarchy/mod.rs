//! Catalog package hierarchies.
//!
//! Package ids are dotted paths whose segments are the aliases of every
//! ancestor, so most of the arithmetic lives in [`domain`]. The services
//! mirror service packages from one workspace into another and provision
//! the group tree that holds namespace snapshots.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
