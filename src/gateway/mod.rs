//! Gateways to the remote agents and to the API catalog.
//!
//! The control plane only talks to its two upstreams through the ports in
//! [`ports`]. [`adapters::http`] speaks the real wire protocols with
//! `reqwest`; [`adapters::memory`] provides scripted stand-ins used by tests
//! and local runs.

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
