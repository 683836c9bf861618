//! # Event Record Store
//!
//! Persistence collaborator for [`EventRoster`] aggregates.
//!
//! The store is assumed to provide at least read-committed consistency. Every
//! save checks and bumps `Event::version`; a stale save fails with
//! [`StoreError::ConcurrentModification`].
//!
//! Mutations go through an [`EventSession`] opened with
//! [`EventStore::begin_exclusive`]. The session holds the store's own per-event
//! exclusion from load to commit, so processes that share a database (the
//! request handlers and the standalone sweeper) serialize on the same event.
//! The in-process lock registry still orders tasks inside one process; the
//! version check catches writers that bypass both.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::error::VolunteerError;
use crate::models::{EventId, EventRoster};

pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;

/// Error types for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Event {event_id} already exists")]
    DuplicateEvent { event_id: EventId },

    #[error("Event {event_id} not found")]
    EventNotFound { event_id: EventId },

    #[error("Concurrent modification detected for event {event_id} (expected version {expected_version})")]
    ConcurrentModification {
        event_id: EventId,
        expected_version: i64,
    },

    #[error("Corrupt stored value for {field}: {value}")]
    CorruptRecord { field: &'static str, value: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for VolunteerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EventNotFound { event_id } => VolunteerError::event_not_found(event_id),
            StoreError::ConcurrentModification { event_id, .. } => {
                VolunteerError::ConcurrentModification { event_id }
            }
            other => VolunteerError::PersistenceError(other.to_string()),
        }
    }
}

/// Exclusive load/save scope for one event.
///
/// Dropping a session without [`commit`](EventSession::commit) releases the
/// exclusion and discards anything saved through it where the store supports
/// rollback.
#[async_trait]
pub trait EventSession: Send {
    async fn load(&mut self) -> StoreResult<Option<EventRoster>>;

    /// Save the roster if its version is current; returns the new version
    async fn save(&mut self, roster: &EventRoster) -> StoreResult<i64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Load/save collaborator for event rosters
#[async_trait]
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Open a session that excludes every other session on `event_id` until it
    /// commits or is dropped
    async fn begin_exclusive(&self, event_id: EventId) -> StoreResult<Box<dyn EventSession>>;

    /// Persist a newly created event
    async fn insert(&self, roster: &EventRoster) -> StoreResult<()>;

    /// Load an event with its participation records and waitlist
    async fn load(&self, event_id: EventId) -> StoreResult<Option<EventRoster>>;

    /// Save the roster if its version is current; returns the new version
    async fn save(&self, roster: &EventRoster) -> StoreResult<i64>;

    /// Events holding at least one seat offer whose window closed before `now`
    async fn events_with_expired_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<EventId>>;
}
