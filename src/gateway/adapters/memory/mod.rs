//! In-process gateway doubles for tests and local runs.

mod agent;
mod catalog;

pub use agent::{RecordedProbe, ScriptedAgent};
pub use catalog::InMemoryCatalog;
