//! Adapter implementations for the agent registry port.

pub mod memory;
pub mod postgres;
