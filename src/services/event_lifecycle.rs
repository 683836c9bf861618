//! # Event Lifecycle Service
//!
//! Creation and caller-requested status transitions for events, plus
//! post-event attendance recording.
//!
//! Status changes go through [`EventStateMachine`], which enforces the edge
//! table and guards. Cancelling an event cancels every active participation and
//! clears the waitlist.

use serde_json::json;
use tracing::info;

use super::critical_section::{load_roster, run_exclusive, Outbox};
use crate::constants::{events, system};
use crate::error::{Result, VolunteerError};
use crate::logging::log_capacity_operation;
use crate::models::{Event, EventId, EventRoster, NewEvent, VolunteerId};
use crate::notifications::NotificationKind;
use crate::state_machine::{AppliedTransition, EventStateMachine, EventStatus, ParticipationStatus};
use crate::system_context::SystemContext;

#[derive(Debug, Clone)]
pub struct EventLifecycleService {
    context: SystemContext,
}

impl EventLifecycleService {
    pub fn new(context: SystemContext) -> Self {
        Self { context }
    }

    /// Create a PENDING event
    pub async fn create_event(&self, new_event: NewEvent) -> Result<Event> {
        let event = new_event.into_event(self.context.now())?;
        let roster = EventRoster::new(event.clone());
        self.context.store.insert(&roster).await?;

        info!(
            event_id = %event.id,
            capacity = event.capacity,
            waitlist_enabled = event.waitlist_enabled,
            max_waitlist_size = event.max_waitlist_size,
            "Event created"
        );
        self.context.event_publisher.publish(
            events::EVENT_CREATED,
            json!({ "event_id": event.id, "capacity": event.capacity }),
        );
        Ok(event)
    }

    pub async fn get_event(&self, event_id: EventId) -> Result<EventRoster> {
        load_roster(&self.context, event_id).await
    }

    /// Move the event to `target`, validating edges and guards
    pub async fn transition_status(
        &self,
        event_id: EventId,
        target: EventStatus,
    ) -> Result<AppliedTransition> {
        run_exclusive(&self.context, event_id, "transition_status", |roster, now, outbox| {
            let applied = EventStateMachine::transition_to(roster, target, now)?;
            if applied.to == EventStatus::Cancelled {
                Self::cancel_participants(roster, now, outbox)?;
            }
            outbox.status_changed(event_id, applied.from, applied.to);
            Ok(applied)
        })
        .await
    }

    pub async fn approve(&self, event_id: EventId) -> Result<AppliedTransition> {
        self.transition_status(event_id, EventStatus::Approved).await
    }

    pub async fn reject(&self, event_id: EventId) -> Result<AppliedTransition> {
        self.transition_status(event_id, EventStatus::Rejected).await
    }

    pub async fn cancel_event(&self, event_id: EventId) -> Result<AppliedTransition> {
        self.transition_status(event_id, EventStatus::Cancelled).await
    }

    /// Only allowed once the event has started
    pub async fn complete_event(&self, event_id: EventId) -> Result<AppliedTransition> {
        self.transition_status(event_id, EventStatus::Completed).await
    }

    fn cancel_participants(
        roster: &mut EventRoster,
        now: chrono::DateTime<chrono::Utc>,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let event_id = roster.event.id;
        roster.waitlist_mut().drain_active();

        let affected: Vec<VolunteerId> = roster
            .participations()
            .iter()
            .filter(|p| {
                matches!(
                    p.status,
                    ParticipationStatus::Registered | ParticipationStatus::Waitlisted
                )
            })
            .map(|p| p.volunteer_id)
            .collect();

        for volunteer_id in &affected {
            roster.transition_participation(
                *volunteer_id,
                ParticipationStatus::Cancelled,
                Some(system::REASON_EVENT_CANCELLED),
                now,
            )?;
            outbox.notify(*volunteer_id, event_id, NotificationKind::EventCancelled);
        }

        log_capacity_operation(
            "cancel_event",
            &event_id.to_string(),
            None,
            "cancelled",
            Some(roster.seats_taken()),
            Some(roster.event.capacity),
        );
        Ok(())
    }

    /// Mark a registered volunteer as attended or absent after the start time
    pub async fn record_attendance(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
        attended: bool,
    ) -> Result<ParticipationStatus> {
        run_exclusive(&self.context, event_id, "record_attendance", |roster, now, outbox| {
            if !roster.event.has_started(now) {
                return Err(VolunteerError::GuardFailed {
                    reason: format!("event {event_id} has not started yet"),
                });
            }
            let target = if attended {
                ParticipationStatus::Attended
            } else {
                ParticipationStatus::NoShow
            };
            roster.transition_participation(volunteer_id, target, None, now)?;

            outbox.publish(
                events::VOLUNTEER_ATTENDANCE_RECORDED,
                json!({
                    "event_id": event_id,
                    "volunteer_id": volunteer_id,
                    "status": target,
                }),
            );
            Ok(target)
        })
        .await
    }
}
