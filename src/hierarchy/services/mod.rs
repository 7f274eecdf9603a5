//! Services that create catalog hierarchies.

mod provision;
mod replicate;

pub use provision::{ProvisionError, ProvisionResult, SnapshotTreeProvisioner};
pub use replicate::{ReplicationError, ReplicationReport, ReplicationResult, StructureReplicator};
