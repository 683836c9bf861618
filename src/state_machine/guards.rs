use chrono::{DateTime, Utc};

use super::errors::{business_rule_violation, resource_unavailable, GuardResult};
use crate::models::EventRoster;

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if a transition is allowed
    fn check(&self, entity: &T, now: DateTime<Utc>) -> GuardResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard to check every seat is taken before an event is marked full
pub struct CapacityReachedGuard;

impl StateGuard<EventRoster> for CapacityReachedGuard {
    fn check(&self, roster: &EventRoster, _now: DateTime<Utc>) -> GuardResult<()> {
        let free = roster.free_seats();
        if free > 0 {
            return Err(business_rule_violation(format!(
                "Event {} still has {} free seats",
                roster.event.id, free
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Every seat must be taken"
    }
}

/// Guard to check a seat is free before a full event reopens
pub struct SeatAvailableGuard;

impl StateGuard<EventRoster> for SeatAvailableGuard {
    fn check(&self, roster: &EventRoster, _now: DateTime<Utc>) -> GuardResult<()> {
        if !roster.has_free_seat() {
            return Err(resource_unavailable(format!(
                "Event {} has no free seat",
                roster.event.id
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "At least one seat must be free"
    }
}

/// Guard to check an event has started before it is completed
pub struct EventStartedGuard;

impl StateGuard<EventRoster> for EventStartedGuard {
    fn check(&self, roster: &EventRoster, now: DateTime<Utc>) -> GuardResult<()> {
        if !roster.event.has_started(now) {
            return Err(business_rule_violation(format!(
                "Event {} cannot complete before its start time {}",
                roster.event.id, roster.event.start_time
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Event must have started"
    }
}
