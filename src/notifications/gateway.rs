use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{EventId, VolunteerId};

/// What a volunteer is being told
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    /// A seat opened up; accept before `expires_at`
    SeatOffered { expires_at: DateTime<Utc> },
    /// The volunteer now holds a seat from the waitlist
    PromotionConfirmed,
    /// The acceptance window closed without an answer
    OfferExpired,
    /// The event was called off
    EventCancelled,
}

impl NotificationKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SeatOffered { .. } => "seat_offered",
            Self::PromotionConfirmed => "promotion_confirmed",
            Self::OfferExpired => "offer_expired",
            Self::EventCancelled => "event_cancelled",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pending notification collected inside a critical section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub volunteer_id: VolunteerId,
    pub event_id: EventId,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(volunteer_id: VolunteerId, event_id: EventId, kind: NotificationKind) -> Self {
        Self {
            volunteer_id,
            event_id,
            kind,
        }
    }
}

/// Error types for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("Notification timed out after {0}ms")]
    Timeout(u64),
}

/// External notification delivery (email, SMS, push).
///
/// Delivery is fire-and-forget from the core's point of view: results are only
/// logged, never retried, and never roll back a state change.
#[async_trait]
pub trait NotificationGateway: Send + Sync + fmt::Debug {
    async fn notify(
        &self,
        volunteer_id: VolunteerId,
        event_id: EventId,
        kind: &NotificationKind,
    ) -> Result<(), NotificationError>;
}

/// Gateway that writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationGateway;

#[async_trait]
impl NotificationGateway for TracingNotificationGateway {
    async fn notify(
        &self,
        volunteer_id: VolunteerId,
        event_id: EventId,
        kind: &NotificationKind,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            volunteer_id = %volunteer_id,
            event_id = %event_id,
            kind = %kind,
            "Notification issued"
        );
        Ok(())
    }
}
