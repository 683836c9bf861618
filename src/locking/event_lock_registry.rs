//! # Event Lock Registry
//!
//! Per-event exclusive scopes for capacity-mutating operations.
//!
//! Each event id maps to its own async mutex, created on first use. Holding the
//! guard for one event never blocks work on another event. Idle locks (no guard
//! outstanding, nobody waiting) are dropped by [`EventLockRegistry::prune_idle`].
//!
//! Register, unregister, accept/decline/promote and the expiry sweep all take
//! the lock through this registry, so the capacity manager and the promotion
//! controller share one lock granularity.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use crate::models::EventId;

/// Registry of per-event locks
#[derive(Debug, Default)]
pub struct EventLockRegistry {
    locks: DashMap<EventId, Arc<Mutex<()>>>,
}

/// Exclusive scope for a single event, released on drop
#[derive(Debug)]
pub struct EventLockGuard {
    event_id: EventId,
    _guard: OwnedMutexGuard<()>,
}

impl EventLockGuard {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }
}

impl EventLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the event's exclusive scope
    pub async fn acquire(&self, event_id: EventId) -> EventLockGuard {
        // Clone the Arc out so the map shard is released before awaiting
        let lock = self.lock_for(event_id);
        let guard = lock.lock_owned().await;
        trace!(event_id = %event_id, "Acquired event lock");
        EventLockGuard {
            event_id,
            _guard: guard,
        }
    }

    /// Take the event's exclusive scope only if it is free right now
    pub fn try_acquire(&self, event_id: EventId) -> Option<EventLockGuard> {
        let lock = self.lock_for(event_id);
        lock.try_lock_owned().ok().map(|guard| EventLockGuard {
            event_id,
            _guard: guard,
        })
    }

    /// Drop locks nobody holds or waits on; returns how many were removed
    pub fn prune_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let removed = before.saturating_sub(self.locks.len());
        if removed > 0 {
            trace!(removed = removed, "Pruned idle event locks");
        }
        removed
    }

    /// Number of locks currently tracked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn lock_for(&self, event_id: EventId) -> Arc<Mutex<()>> {
        self.locks
            .entry(event_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
