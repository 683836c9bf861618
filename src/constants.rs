//! # System Constants
//!
//! Default windows and intervals, status groups and lifecycle event names used
//! across the capacity and waitlist core.

// Re-export state types for convenience
pub use crate::state_machine::{EventStatus, ParticipationStatus, WaitlistEntryStatus};

/// Lifecycle events published on the [`EventPublisher`](crate::events::EventPublisher)
pub mod events {
    // Registration lifecycle events
    pub const VOLUNTEER_REGISTERED: &str = "volunteer.registered";
    pub const VOLUNTEER_WAITLISTED: &str = "volunteer.waitlisted";
    pub const VOLUNTEER_UNREGISTERED: &str = "volunteer.unregistered";
    pub const VOLUNTEER_ATTENDANCE_RECORDED: &str = "volunteer.attendance_recorded";

    // Waitlist promotion events
    pub const WAITLIST_OFFER_SENT: &str = "waitlist.offer_sent";
    pub const WAITLIST_OFFER_EXPIRED: &str = "waitlist.offer_expired";
    pub const WAITLIST_OFFER_DECLINED: &str = "waitlist.offer_declined";
    pub const WAITLIST_PROMOTED: &str = "waitlist.promoted";
    pub const WAITLIST_LEFT: &str = "waitlist.left";

    // Event lifecycle events
    pub const EVENT_CREATED: &str = "event.created";
    pub const EVENT_STATUS_CHANGED: &str = "event.status_changed";
}

/// System-wide defaults
pub mod system {
    /// Hours a notified volunteer has to accept a seat offer
    pub const ACCEPTANCE_WINDOW_HOURS: u32 = 24;

    /// Default expiry sweep cadence
    pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;

    pub const DEFAULT_NOTIFICATION_TIMEOUT_MS: u64 = 5_000;

    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_000;

    /// Reasons recorded on participation transitions
    pub const REASON_VOLUNTEER_WITHDREW: &str = "volunteer_withdrew";
    pub const REASON_LEFT_WAITLIST: &str = "left_waitlist";
    pub const REASON_PROMOTION_ACCEPTED: &str = "promotion_accepted";
    pub const REASON_PROMOTION_DECLINED: &str = "promotion_declined";
    pub const REASON_PROMOTION_EXPIRED: &str = "promotion_window_expired";
    pub const REASON_MANUAL_PROMOTION: &str = "manual_promotion";
    pub const REASON_EVENT_CANCELLED: &str = "event_cancelled";
}

/// Status groupings for capacity and waitlist decisions
pub mod status_groups {
    use super::{EventStatus, ParticipationStatus, WaitlistEntryStatus};

    /// Participation statuses counted against capacity
    pub const SEAT_HOLDING_STATES: &[ParticipationStatus] = &[
        ParticipationStatus::Registered,
        ParticipationStatus::Attended,
        ParticipationStatus::NoShow,
    ];

    /// Waitlist statuses counted against `max_waitlist_size`
    pub const ACTIVE_WAITLIST_STATES: &[WaitlistEntryStatus] =
        &[WaitlistEntryStatus::Waiting, WaitlistEntryStatus::Notified];

    /// Event statuses accepting waitlist joins
    pub const WAITLIST_OPEN_STATES: &[EventStatus] = &[EventStatus::Approved, EventStatus::Full];

    pub const EVENT_FINAL_STATES: &[EventStatus] = &[
        EventStatus::Rejected,
        EventStatus::Cancelled,
        EventStatus::Completed,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_groups_agree_with_state_predicates() {
        for status in status_groups::SEAT_HOLDING_STATES {
            assert!(status.holds_seat());
        }
        for status in status_groups::ACTIVE_WAITLIST_STATES {
            assert!(status.is_active());
        }
        for status in status_groups::WAITLIST_OPEN_STATES {
            assert!(status.permits_waitlist_join());
        }
        for status in status_groups::EVENT_FINAL_STATES {
            assert!(status.is_terminal());
        }
    }
}
