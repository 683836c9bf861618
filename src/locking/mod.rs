//! Per-event mutual exclusion.

pub mod event_lock_registry;

pub use event_lock_registry::{EventLockGuard, EventLockRegistry};
