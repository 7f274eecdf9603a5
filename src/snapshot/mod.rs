//! Namespace snapshots.
//!
//! A snapshot publishes the specifications of every selected service of a
//! namespace at one version label, plus a dashboard version referencing
//! them all. Publication happens in the background after the build
//! configurations are returned; its outcome is reported through a
//! [`domain::DispatchHandle`].

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
