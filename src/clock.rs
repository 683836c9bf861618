//! Time source for acceptance windows and start-time checks.
//!
//! Services read the current time through [`Clock`] so tests can move time
//! forward deterministically (see [`ManualClock`](crate::test_helpers::ManualClock)).

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
