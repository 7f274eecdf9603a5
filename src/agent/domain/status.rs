//! Agent activity derived from heartbeat age.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Activity of a registered agent at observation time.
///
/// Activity is never stored; it is recomputed from the last heartbeat
/// whenever an agent is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// The last heartbeat falls inside the activity window.
    Active,
    /// The last heartbeat is older than the activity window.
    Inactive,
}

impl AgentStatus {
    /// Returns the canonical text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long an agent stays active after its last heartbeat.
///
/// The window is closed: a heartbeat exactly `period` old still counts.
/// Storage filters and in-memory derivation both go through
/// [`ActivityWindow::cutoff`] so the two never disagree on the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow(Duration);

impl ActivityWindow {
    /// Creates a window of the given length.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self(period)
    }

    /// Returns the window length.
    #[must_use]
    pub const fn period(self) -> Duration {
        self.0
    }

    /// Returns the oldest heartbeat time still considered active at `now`.
    ///
    /// Windows too long to represent saturate to the earliest instant.
    #[must_use]
    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.0)
            .ok()
            .and_then(|delta| now.checked_sub_signed(delta))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Derives the activity of a heartbeat stamped `last_active`.
    ///
    /// A heartbeat stamped in the future counts as active.
    #[must_use]
    pub fn status_of(self, last_active: DateTime<Utc>, now: DateTime<Utc>) -> AgentStatus {
        if last_active >= self.cutoff(now) {
            AgentStatus::Active
        } else {
            AgentStatus::Inactive
        }
    }
}
