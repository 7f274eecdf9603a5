//! Panic isolation for concurrently dispatched units of work.
//!
//! Every fan-out in the control plane (replication branches, snapshot
//! dispatch, probing workers, the background audit pipeline) runs through
//! [`guarded`] or [`spawn`]. A panic inside one unit is logged and converted
//! into a [`UnitPanicked`] value for that unit only.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::error;

/// A supervised unit panicked before producing a value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{unit} panicked: {message}")]
pub struct UnitPanicked {
    /// Name of the unit that panicked.
    pub unit: String,
    /// Panic payload rendered as text when possible.
    pub message: String,
}

/// Polls `future` to completion, catching any panic it raises.
///
/// # Errors
///
/// Returns [`UnitPanicked`] when the future panics.
pub async fn guarded<F, T>(unit: &str, future: F) -> Result<T, UnitPanicked>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => Ok(value),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(unit, panic = %message, "supervised unit panicked");
            Err(UnitPanicked {
                unit: unit.to_owned(),
                message,
            })
        }
    }
}

/// Spawns `future` on the runtime behind a panic guard.
///
/// The returned handle resolves to `None` when the unit panicked.
pub fn spawn<F, T>(unit: impl Into<String>, future: F) -> JoinHandle<Option<T>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let name = unit.into();
    tokio::spawn(async move { guarded(&name, future).await.ok() })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
