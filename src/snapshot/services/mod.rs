//! Snapshot creation and reads.

mod archive;
mod builder;
mod error;
mod reader;

pub use builder::SnapshotService;
pub use error::{SnapshotError, SnapshotResult};
