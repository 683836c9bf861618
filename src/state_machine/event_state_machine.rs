use chrono::{DateTime, Utc};

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::EventLifecycleEvent,
    guards::{CapacityReachedGuard, EventStartedGuard, SeatAvailableGuard, StateGuard},
    states::EventStatus,
};
use crate::models::EventRoster;

/// A transition that was applied to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedTransition {
    pub from: EventStatus,
    pub to: EventStatus,
    pub event: EventLifecycleEvent,
}

/// Event lifecycle state machine.
///
/// Stateless: it validates and applies transitions to a roster the caller
/// already holds under the event lock.
pub struct EventStateMachine;

impl EventStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: EventStatus,
        event: EventLifecycleEvent,
    ) -> StateMachineResult<EventStatus> {
        let target = event.target_status();
        if !current_state.can_transition_to(target) {
            return Err(StateMachineError::InvalidTransition {
                from: current_state.to_string(),
                to: target.to_string(),
            });
        }
        Ok(target)
    }

    /// Apply `event` to the roster's event
    pub fn transition(
        roster: &mut EventRoster,
        event: EventLifecycleEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<AppliedTransition> {
        let from = roster.event.status;
        let to = Self::determine_target_state(from, event)?;

        Self::check_guards(roster, from, to, now)?;

        roster.event.status = to;
        roster.touch(now);

        tracing::debug!(
            event_id = %roster.event.id,
            from = %from,
            to = %to,
            trigger = event.event_type(),
            "Event status transitioned"
        );

        Ok(AppliedTransition { from, to, event })
    }

    /// Apply a transition requested by target status
    pub fn transition_to(
        roster: &mut EventRoster,
        target: EventStatus,
        now: DateTime<Utc>,
    ) -> StateMachineResult<AppliedTransition> {
        let from = roster.event.status;
        let event = EventLifecycleEvent::for_target(from, target).ok_or_else(|| {
            StateMachineError::InvalidTransition {
                from: from.to_string(),
                to: target.to_string(),
            }
        })?;
        Self::transition(roster, event, now)
    }

    /// Bring APPROVED/FULL in line with current seat usage.
    ///
    /// Returns the transition when one was needed.
    pub fn sync_capacity_status(
        roster: &mut EventRoster,
        now: DateTime<Utc>,
    ) -> StateMachineResult<Option<AppliedTransition>> {
        let event = match roster.event.status {
            EventStatus::Approved if !roster.has_free_seat() => EventLifecycleEvent::CapacityReached,
            EventStatus::Full if roster.has_free_seat() => EventLifecycleEvent::SeatFreed,
            _ => return Ok(None),
        };
        Self::transition(roster, event, now).map(Some)
    }

    /// Check guard conditions for the transition
    fn check_guards(
        roster: &EventRoster,
        from: EventStatus,
        to: EventStatus,
        now: DateTime<Utc>,
    ) -> StateMachineResult<()> {
        match (from, to) {
            (EventStatus::Approved, EventStatus::Full) => {
                CapacityReachedGuard.check(roster, now)?;
            }
            (EventStatus::Full, EventStatus::Approved) => {
                SeatAvailableGuard.check(roster, now)?;
            }
            (_, EventStatus::Completed) => {
                EventStartedGuard.check(roster, now)?;
            }
            // No special guards for other transitions
            _ => {}
        }

        Ok(())
    }
}
