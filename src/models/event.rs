//! # Event Model
//!
//! Capacity-bearing event record. Registrants and the waitlist live beside the
//! event in [`EventRoster`](super::EventRoster); this struct carries only the
//! event's own columns.
//!
//! ## Database Schema
//!
//! Maps to `volunteer_events`:
//! ```sql
//! CREATE TABLE volunteer_events (
//!   event_id UUID PRIMARY KEY,
//!   title VARCHAR NOT NULL,
//!   capacity INTEGER NOT NULL CHECK (capacity > 0),
//!   status VARCHAR NOT NULL,
//!   waitlist_enabled BOOLEAN NOT NULL,
//!   max_waitlist_size INTEGER NOT NULL CHECK (max_waitlist_size >= 0),
//!   start_time TIMESTAMPTZ NOT NULL,
//!   version BIGINT NOT NULL DEFAULT 0,
//!   -- ... timestamps
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::EventId;
use crate::error::{Result, VolunteerError};
use crate::state_machine::EventStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub capacity: u32,
    pub status: EventStatus,
    pub waitlist_enabled: bool,
    pub max_waitlist_size: u32,
    pub start_time: DateTime<Utc>,
    /// Optimistic concurrency version, bumped by every successful save
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New Event for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub capacity: u32,
    pub waitlist_enabled: bool,
    pub max_waitlist_size: u32,
    pub start_time: DateTime<Utc>,
}

impl NewEvent {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(VolunteerError::ValidationError(
                "event title must not be empty".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(VolunteerError::ValidationError(
                "event capacity must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the pending event record
    pub fn into_event(self, now: DateTime<Utc>) -> Result<Event> {
        self.validate()?;
        Ok(Event {
            id: EventId::new(),
            title: self.title,
            capacity: self.capacity,
            status: EventStatus::Pending,
            waitlist_enabled: self.waitlist_enabled,
            max_waitlist_size: self.max_waitlist_size,
            start_time: self.start_time,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Event {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }

    pub fn ensure_not_started(&self, now: DateTime<Utc>) -> Result<()> {
        if self.has_started(now) {
            return Err(VolunteerError::EventAlreadyStarted {
                event_id: self.id,
                start_time: self.start_time,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_event(capacity: u32) -> NewEvent {
        NewEvent {
            title: "Food shelf restock".to_string(),
            capacity,
            waitlist_enabled: true,
            max_waitlist_size: 3,
            start_time: Utc::now() + Duration::days(2),
        }
    }

    #[test]
    fn test_new_event_starts_pending() {
        let now = Utc::now();
        let event = new_event(5).into_event(now).unwrap();
        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.version, 0);
        assert_eq!(event.created_at, now);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = new_event(0).into_event(Utc::now()).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let mut new = new_event(2);
        new.title = "   ".to_string();
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_start_time_boundary() {
        let event = new_event(1).into_event(Utc::now()).unwrap();
        assert!(!event.has_started(event.start_time - Duration::seconds(1)));
        assert!(event.has_started(event.start_time));
        assert!(event.ensure_not_started(event.start_time).is_err());
    }
}
