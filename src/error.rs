//! Error types for the volunteer coordination core.
//!

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{EventId, VolunteerId};
use crate::state_machine::EventStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VolunteerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Volunteer {volunteer_id} already has an active record for event {event_id}")]
    AlreadyRegistered {
        event_id: EventId,
        volunteer_id: VolunteerId,
    },
    #[error("Event {event_id} is full and no waitlist is available")]
    EventFull { event_id: EventId },
    #[error("Event {event_id} is full and its waitlist is disabled")]
    WaitlistDisabled { event_id: EventId },
    #[error("Waitlist for event {event_id} is full ({max_size} active entries)")]
    WaitlistFull { event_id: EventId, max_size: u32 },
    #[error("Event {event_id} has a free seat; register instead of joining the waitlist")]
    SeatAvailable { event_id: EventId },
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },
    #[error("Event {event_id} is not open for registration (status: {status})")]
    EventNotOpen {
        event_id: EventId,
        status: EventStatus,
    },
    #[error("Promotion window for volunteer {volunteer_id} on event {event_id} expired at {expired_at}")]
    PromotionWindowExpired {
        event_id: EventId,
        volunteer_id: VolunteerId,
        expired_at: DateTime<Utc>,
    },
    #[error("Volunteer {volunteer_id} has no outstanding seat offer for event {event_id}")]
    PromotionNotOffered {
        event_id: EventId,
        volunteer_id: VolunteerId,
    },
    #[error("Event {event_id} already started at {start_time}")]
    EventAlreadyStarted {
        event_id: EventId,
        start_time: DateTime<Utc>,
    },
    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Event {event_id} was modified concurrently")]
    ConcurrentModification { event_id: EventId },
}

impl VolunteerError {
    pub fn event_not_found(event_id: EventId) -> Self {
        Self::NotFound {
            entity: "event",
            id: event_id.to_string(),
        }
    }

    pub fn participation_not_found(event_id: EventId, volunteer_id: VolunteerId) -> Self {
        Self::NotFound {
            entity: "participation",
            id: format!("{event_id}/{volunteer_id}"),
        }
    }

    pub fn waitlist_entry_not_found(event_id: EventId, volunteer_id: VolunteerId) -> Self {
        Self::NotFound {
            entity: "waitlist entry",
            id: format!("{event_id}/{volunteer_id}"),
        }
    }

    /// Stable machine-readable code for upstream request handlers
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::EventFull { .. } => "event_full",
            Self::WaitlistDisabled { .. } => "waitlist_disabled",
            Self::WaitlistFull { .. } => "waitlist_full",
            Self::SeatAvailable { .. } => "seat_available",
            Self::InvalidStatusTransition { .. } => "invalid_status_transition",
            Self::EventNotOpen { .. } => "event_not_open",
            Self::PromotionWindowExpired { .. } => "promotion_window_expired",
            Self::PromotionNotOffered { .. } => "promotion_not_offered",
            Self::EventAlreadyStarted { .. } => "event_already_started",
            Self::GuardFailed { .. } => "guard_failed",
            Self::ValidationError(_) => "validation_error",
            Self::ConfigurationError(_) => "configuration_error",
            Self::PersistenceError(_) => "persistence_error",
            Self::ConcurrentModification { .. } => "concurrent_modification",
        }
    }

    /// Capacity-related rejections the caller can act on (waitlist or register)
    pub fn is_capacity_rejection(&self) -> bool {
        matches!(
            self,
            Self::EventFull { .. }
                | Self::WaitlistDisabled { .. }
                | Self::WaitlistFull { .. }
                | Self::SeatAvailable { .. }
        )
    }
}

impl From<config::ConfigError> for VolunteerError {
    fn from(error: config::ConfigError) -> Self {
        VolunteerError::ConfigurationError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VolunteerError>;
