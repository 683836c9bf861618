//! # Capacity Manager
//!
//! Admits, waitlists or rejects registration requests against one event's
//! capacity, and releases seats on unregistration.
//!
//! Every mutation runs inside the event's critical section, so the
//! check-and-increment on the seat count is atomic and concurrent requests for
//! the same event can never overbook it. Unrelated events never wait on each
//! other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::critical_section::{load_roster, run_exclusive, Outbox};
use super::promotion_controller::PromotionController;
use crate::constants::{events, system};
use crate::error::{Result, VolunteerError};
use crate::logging::{log_capacity_operation, log_waitlist_operation};
use crate::models::{EventId, EventRoster, VolunteerId};
use crate::state_machine::{EventStateMachine, EventStatus, ParticipationStatus, WaitlistEntryStatus};
use crate::system_context::SystemContext;

/// Result of a successful registration request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    Registered,
    /// Queued; `position` is the 1-based rank among waiting entries
    Waitlisted { position: usize },
}

impl RegistrationOutcome {
    pub fn status(&self) -> ParticipationStatus {
        match self {
            Self::Registered => ParticipationStatus::Registered,
            Self::Waitlisted { .. } => ParticipationStatus::Waitlisted,
        }
    }
}

/// A volunteer's view of their place on an event's waitlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistStatus {
    pub is_on_waitlist: bool,
    /// Rank among waiting entries; `None` when notified or absent
    pub position: Option<usize>,
    pub entry_status: Option<WaitlistEntryStatus>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CapacityManager {
    context: SystemContext,
    promotions: PromotionController,
}

impl CapacityManager {
    pub fn new(context: SystemContext, promotions: PromotionController) -> Self {
        Self {
            context,
            promotions,
        }
    }

    /// Register a volunteer, falling back to the waitlist when the event is full
    pub async fn register(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
    ) -> Result<RegistrationOutcome> {
        let outcome = run_exclusive(&self.context, event_id, "register", |roster, now, outbox| {
            let status = roster.event.status;
            if !status.permits_waitlist_join() {
                return Err(VolunteerError::EventNotOpen { event_id, status });
            }
            roster.event.ensure_not_started(now)?;
            if roster.active_participation(volunteer_id).is_some() {
                return Err(VolunteerError::AlreadyRegistered {
                    event_id,
                    volunteer_id,
                });
            }

            if status.permits_registration() && roster.has_free_seat() {
                Self::admit(roster, volunteer_id, now, outbox)?;
                return Ok(RegistrationOutcome::Registered);
            }

            if !roster.event.waitlist_enabled {
                return Err(VolunteerError::WaitlistDisabled { event_id });
            }
            if roster.event.max_waitlist_size == 0 {
                return Err(VolunteerError::EventFull { event_id });
            }
            let position = Self::enqueue(roster, volunteer_id, now, outbox)?;
            Ok(RegistrationOutcome::Waitlisted { position })
        })
        .await;

        if let Err(e) = &outcome {
            log_capacity_operation(
                "register",
                &event_id.to_string(),
                Some(&volunteer_id.to_string()),
                e.code(),
                None,
                None,
            );
        }
        outcome
    }

    /// Take a seat; caller has checked that one is free
    fn admit(
        roster: &mut EventRoster,
        volunteer_id: VolunteerId,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<()> {
        let event_id = roster.event.id;
        roster.open_participation(volunteer_id, ParticipationStatus::Registered, now)?;

        if let Some(applied) = EventStateMachine::sync_capacity_status(roster, now)? {
            outbox.status_changed(event_id, applied.from, applied.to);
        }

        log_capacity_operation(
            "register",
            &event_id.to_string(),
            Some(&volunteer_id.to_string()),
            "registered",
            Some(roster.seats_taken()),
            Some(roster.event.capacity),
        );
        outbox.publish(
            events::VOLUNTEER_REGISTERED,
            json!({
                "event_id": event_id,
                "volunteer_id": volunteer_id,
                "seats_taken": roster.seats_taken(),
                "capacity": roster.event.capacity,
            }),
        );
        Ok(())
    }

    /// Append to the waitlist and open a waitlisted record; returns the position
    fn enqueue(
        roster: &mut EventRoster,
        volunteer_id: VolunteerId,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<usize> {
        let event_id = roster.event.id;
        let max_size = roster.event.max_waitlist_size;
        roster
            .waitlist_mut()
            .join(event_id, volunteer_id, now, max_size)?;
        roster.open_participation(volunteer_id, ParticipationStatus::Waitlisted, now)?;

        // The new entry is the last waiting one
        let position = roster.waitlist().waiting_count();
        log_waitlist_operation(
            "join",
            &event_id.to_string(),
            &volunteer_id.to_string(),
            Some(position),
            roster.waitlist().active_count(),
        );
        outbox.publish(
            events::VOLUNTEER_WAITLISTED,
            json!({
                "event_id": event_id,
                "volunteer_id": volunteer_id,
                "position": position,
            }),
        );
        Ok(position)
    }

    /// Withdraw a registered or waitlisted volunteer.
    ///
    /// A freed seat is offered to the waitlist; a FULL event reopens.
    pub async fn unregister(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        run_exclusive(&self.context, event_id, "unregister", |roster, now, outbox| {
            roster.event.ensure_not_started(now)?;
            let current = roster
                .active_participation(volunteer_id)
                .map(|p| p.status)
                .ok_or_else(|| VolunteerError::participation_not_found(event_id, volunteer_id))?;

            roster.transition_participation(
                volunteer_id,
                ParticipationStatus::Cancelled,
                Some(system::REASON_VOLUNTEER_WITHDREW),
                now,
            )?;

            match current {
                ParticipationStatus::Waitlisted => {
                    let left = roster.waitlist_mut().leave(volunteer_id);
                    if left.is_some_and(|entry| entry.is_notified()) {
                        self.promotions.on_seat_freed(roster, now, outbox);
                    }
                }
                _ => {
                    if let Some(applied) = EventStateMachine::sync_capacity_status(roster, now)? {
                        outbox.status_changed(event_id, applied.from, applied.to);
                    }
                    self.promotions.on_seat_freed(roster, now, outbox);
                }
            }

            log_capacity_operation(
                "unregister",
                &event_id.to_string(),
                Some(&volunteer_id.to_string()),
                "cancelled",
                Some(roster.seats_taken()),
                Some(roster.event.capacity),
            );
            outbox.publish(
                events::VOLUNTEER_UNREGISTERED,
                json!({
                    "event_id": event_id,
                    "volunteer_id": volunteer_id,
                    "previous_status": current,
                }),
            );
            Ok(())
        })
        .await
    }

    /// Join the waitlist explicitly; only allowed while no seat is free
    pub async fn join_waitlist(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<usize> {
        run_exclusive(&self.context, event_id, "join_waitlist", |roster, now, outbox| {
            let status = roster.event.status;
            if !status.permits_waitlist_join() {
                return Err(VolunteerError::EventNotOpen { event_id, status });
            }
            roster.event.ensure_not_started(now)?;
            if !roster.event.waitlist_enabled {
                return Err(VolunteerError::WaitlistDisabled { event_id });
            }
            if roster.active_participation(volunteer_id).is_some() {
                return Err(VolunteerError::AlreadyRegistered {
                    event_id,
                    volunteer_id,
                });
            }
            if roster.has_free_seat() {
                return Err(VolunteerError::SeatAvailable { event_id });
            }
            Self::enqueue(roster, volunteer_id, now, outbox)
        })
        .await
    }

    /// Leave the waitlist; an outstanding offer passes to the next entry
    pub async fn leave_waitlist(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<()> {
        run_exclusive(&self.context, event_id, "leave_waitlist", |roster, now, outbox| {
            let waitlisted = roster
                .active_participation(volunteer_id)
                .is_some_and(|p| p.status == ParticipationStatus::Waitlisted);
            if !waitlisted {
                return Err(VolunteerError::waitlist_entry_not_found(
                    event_id,
                    volunteer_id,
                ));
            }

            roster.transition_participation(
                volunteer_id,
                ParticipationStatus::Cancelled,
                Some(system::REASON_LEFT_WAITLIST),
                now,
            )?;
            let left = roster.waitlist_mut().leave(volunteer_id);
            if left.as_ref().is_some_and(|entry| entry.is_notified()) {
                self.promotions.on_seat_freed(roster, now, outbox);
            }

            log_waitlist_operation(
                "leave",
                &event_id.to_string(),
                &volunteer_id.to_string(),
                None,
                roster.waitlist().active_count(),
            );
            outbox.publish(
                events::WAITLIST_LEFT,
                json!({ "event_id": event_id, "volunteer_id": volunteer_id }),
            );
            Ok(())
        })
        .await
    }

    pub async fn waitlist_status(
        &self,
        event_id: EventId,
        volunteer_id: VolunteerId,
    ) -> Result<WaitlistStatus> {
        let roster = load_roster(&self.context, event_id).await?;
        let waitlist = roster.waitlist();
        let entry = waitlist.entry(volunteer_id);

        Ok(WaitlistStatus {
            is_on_waitlist: entry.is_some(),
            position: waitlist.position(volunteer_id),
            entry_status: entry.map(|e| e.status),
            expires_at: entry.and_then(|e| e.expires_at),
        })
    }

    /// 1-based waiting rank, `None` when not waiting
    pub async fn position(&self, event_id: EventId, volunteer_id: VolunteerId) -> Result<Option<usize>> {
        let roster = load_roster(&self.context, event_id).await?;
        Ok(roster.waitlist().position(volunteer_id))
    }

    pub async fn registered_volunteers(&self, event_id: EventId) -> Result<Vec<VolunteerId>> {
        let roster = load_roster(&self.context, event_id).await?;
        Ok(roster.registered_volunteers())
    }

    pub async fn event_status(&self, event_id: EventId) -> Result<EventStatus> {
        let roster = load_roster(&self.context, event_id).await?;
        Ok(roster.event.status)
    }
}
