use serde::{Deserialize, Serialize};

use super::states::EventStatus;

/// Events that can trigger event lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventLifecycleEvent {
    /// Review accepted the event
    Approve,
    /// Review turned the event down
    Reject,
    /// The last seat was taken
    CapacityReached,
    /// A seat opened up on a full event
    SeatFreed,
    /// Organizer called the event off
    Cancel,
    /// Event took place
    Complete,
}

impl EventLifecycleEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::CapacityReached => "capacity_reached",
            Self::SeatFreed => "seat_freed",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }

    /// Capacity-driven events are raised by the capacity manager, not by callers
    pub fn is_capacity_driven(&self) -> bool {
        matches!(self, Self::CapacityReached | Self::SeatFreed)
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reject | Self::Cancel | Self::Complete)
    }

    /// The status this event moves an event into
    pub fn target_status(&self) -> EventStatus {
        match self {
            Self::Approve | Self::SeatFreed => EventStatus::Approved,
            Self::Reject => EventStatus::Rejected,
            Self::CapacityReached => EventStatus::Full,
            Self::Cancel => EventStatus::Cancelled,
            Self::Complete => EventStatus::Completed,
        }
    }

    /// Map a requested target status onto the event that produces it
    pub fn for_target(from: EventStatus, target: EventStatus) -> Option<Self> {
        match (from, target) {
            (EventStatus::Full, EventStatus::Approved) => Some(Self::SeatFreed),
            (_, EventStatus::Approved) => Some(Self::Approve),
            (_, EventStatus::Rejected) => Some(Self::Reject),
            (_, EventStatus::Full) => Some(Self::CapacityReached),
            (_, EventStatus::Cancelled) => Some(Self::Cancel),
            (_, EventStatus::Completed) => Some(Self::Complete),
            (_, EventStatus::Pending) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        assert_eq!(EventLifecycleEvent::CapacityReached.event_type(), "capacity_reached");
        assert_eq!(EventLifecycleEvent::Cancel.event_type(), "cancel");
    }

    #[test]
    fn test_for_target() {
        assert_eq!(
            EventLifecycleEvent::for_target(EventStatus::Full, EventStatus::Approved),
            Some(EventLifecycleEvent::SeatFreed)
        );
        assert_eq!(
            EventLifecycleEvent::for_target(EventStatus::Pending, EventStatus::Approved),
            Some(EventLifecycleEvent::Approve)
        );
        assert_eq!(
            EventLifecycleEvent::for_target(EventStatus::Approved, EventStatus::Pending),
            None
        );
    }

    #[test]
    fn test_target_status() {
        assert_eq!(EventLifecycleEvent::SeatFreed.target_status(), EventStatus::Approved);
        assert_eq!(EventLifecycleEvent::CapacityReached.target_status(), EventStatus::Full);
    }

    #[test]
    fn test_capacity_driven() {
        assert!(EventLifecycleEvent::SeatFreed.is_capacity_driven());
        assert!(!EventLifecycleEvent::Approve.is_capacity_driven());
        assert!(EventLifecycleEvent::Complete.is_terminal());
    }
}
