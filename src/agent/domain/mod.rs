//! Domain model for agent registration.

mod error;
mod ids;
mod record;
mod status;

pub use error::AgentDomainError;
pub use ids::AgentId;
pub use record::{AgentHeartbeat, AgentInstance, AgentRecord, PersistedAgentData};
pub use status::{ActivityWindow, AgentStatus};
