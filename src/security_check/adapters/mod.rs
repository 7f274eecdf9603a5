//! Adapter implementations for the audit repository port.

pub mod memory;
pub mod postgres;
