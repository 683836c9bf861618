use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::{EventSession, EventStore, StoreError, StoreResult};
use crate::locking::{EventLockGuard, EventLockRegistry};
use crate::models::{EventId, EventRoster};

type Rosters = Arc<DashMap<EventId, EventRoster>>;

/// Process-local store backed by a concurrent map.
///
/// Sessions take a per-event lock owned by the store, so several
/// [`SystemContext`](crate::SystemContext)s sharing one store serialize the
/// way separate processes sharing a database do.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    rosters: Rosters,
    sessions: EventLockRegistry,
}

/// Session over the map; saves are written through, so `commit` only releases
/// the store lock
#[derive(Debug)]
struct InMemoryEventSession {
    rosters: Rosters,
    event_id: EventId,
    _lock: EventLockGuard,
}

fn save_versioned(rosters: &DashMap<EventId, EventRoster>, roster: &EventRoster) -> StoreResult<i64> {
    let event_id = roster.event.id;
    let mut stored = rosters
        .get_mut(&event_id)
        .ok_or(StoreError::EventNotFound { event_id })?;

    if stored.event.version != roster.event.version {
        return Err(StoreError::ConcurrentModification {
            event_id,
            expected_version: roster.event.version,
        });
    }

    let mut next = roster.clone();
    next.event.version += 1;
    let version = next.event.version;
    *stored = next;
    Ok(version)
}

#[async_trait]
impl EventSession for InMemoryEventSession {
    async fn load(&mut self) -> StoreResult<Option<EventRoster>> {
        Ok(self.rosters.get(&self.event_id).map(|r| r.value().clone()))
    }

    async fn save(&mut self, roster: &EventRoster) -> StoreResult<i64> {
        save_versioned(&self.rosters, roster)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rosters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn begin_exclusive(&self, event_id: EventId) -> StoreResult<Box<dyn EventSession>> {
        let lock = self.sessions.acquire(event_id).await;
        Ok(Box::new(InMemoryEventSession {
            rosters: Arc::clone(&self.rosters),
            event_id,
            _lock: lock,
        }))
    }

    async fn insert(&self, roster: &EventRoster) -> StoreResult<()> {
        let event_id = roster.event.id;
        match self.rosters.entry(event_id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEvent { event_id }),
            Entry::Vacant(slot) => {
                slot.insert(roster.clone());
                Ok(())
            }
        }
    }

    async fn load(&self, event_id: EventId) -> StoreResult<Option<EventRoster>> {
        Ok(self.rosters.get(&event_id).map(|r| r.value().clone()))
    }

    async fn save(&self, roster: &EventRoster) -> StoreResult<i64> {
        save_versioned(&self.rosters, roster)
    }

    async fn events_with_expired_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<EventId>> {
        let mut ids: Vec<EventId> = self
            .rosters
            .iter()
            .filter(|r| !r.waitlist().expired_offers(now).is_empty())
            .map(|r| *r.key())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
