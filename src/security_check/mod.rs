//! Authentication security audits of a namespace.
//!
//! A check discovers the services of a namespace, publishes the ones with
//! an `OpenAPI` document as a draft snapshot, then calls every operation of
//! every published service through the agent proxy without credentials. An
//! operation guarded by any security scheme must answer `401`. Progress and
//! outcomes are persisted per process, per service and per endpoint.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
