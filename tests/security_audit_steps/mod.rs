//! Step definitions for security audit scenarios.

mod given;
mod then;
mod when;
pub mod world;
