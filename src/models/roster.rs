//! # Event Roster
//!
//! The unit of load/save for capacity management: an event, the arena of
//! participation records that reference it, and its waitlist queue.
//!
//! The registered set is derived from participation records in a seat-holding
//! status rather than kept as a separate set, so capacity accounting and the
//! audit trail can never drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::Event;
use super::ids::VolunteerId;
use super::participation::ParticipationRecord;
use crate::error::{Result, VolunteerError};
use crate::state_machine::ParticipationStatus;
use crate::waitlist::WaitlistQueue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRoster {
    pub event: Event,
    participations: Vec<ParticipationRecord>,
    waitlist: WaitlistQueue,
}

impl EventRoster {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            participations: Vec::new(),
            waitlist: WaitlistQueue::new(),
        }
    }

    pub fn from_parts(
        event: Event,
        participations: Vec<ParticipationRecord>,
        waitlist: WaitlistQueue,
    ) -> Self {
        Self {
            event,
            participations,
            waitlist,
        }
    }

    pub fn participations(&self) -> &[ParticipationRecord] {
        &self.participations
    }

    pub fn waitlist(&self) -> &WaitlistQueue {
        &self.waitlist
    }

    pub fn waitlist_mut(&mut self) -> &mut WaitlistQueue {
        &mut self.waitlist
    }

    /// The volunteer's non-cancelled record, if any
    pub fn active_participation(&self, volunteer_id: VolunteerId) -> Option<&ParticipationRecord> {
        self.participations
            .iter()
            .find(|p| p.volunteer_id == volunteer_id && p.is_active())
    }

    /// Every record the volunteer has had for this event, oldest first
    pub fn participation_history(
        &self,
        volunteer_id: VolunteerId,
    ) -> impl Iterator<Item = &ParticipationRecord> {
        self.participations
            .iter()
            .filter(move |p| p.volunteer_id == volunteer_id)
    }

    pub fn registered_volunteers(&self) -> Vec<VolunteerId> {
        self.participations
            .iter()
            .filter(|p| p.status.holds_seat())
            .map(|p| p.volunteer_id)
            .collect()
    }

    pub fn seats_taken(&self) -> u32 {
        self.participations
            .iter()
            .filter(|p| p.status.holds_seat())
            .count() as u32
    }

    pub fn free_seats(&self) -> u32 {
        self.event.capacity.saturating_sub(self.seats_taken())
    }

    pub fn has_free_seat(&self) -> bool {
        self.free_seats() > 0
    }

    /// Free seats not already offered to a notified waitlist entry
    pub fn unoffered_seats(&self) -> u32 {
        self.free_seats()
            .saturating_sub(self.waitlist.notified_count() as u32)
    }

    /// Open a new record for a volunteer with no active record
    pub fn open_participation(
        &mut self,
        volunteer_id: VolunteerId,
        initial: ParticipationStatus,
        now: DateTime<Utc>,
    ) -> Result<&ParticipationRecord> {
        if self.active_participation(volunteer_id).is_some() {
            return Err(VolunteerError::AlreadyRegistered {
                event_id: self.event.id,
                volunteer_id,
            });
        }
        if initial.holds_seat() && !self.has_free_seat() {
            return Err(VolunteerError::EventFull {
                event_id: self.event.id,
            });
        }

        self.participations.push(ParticipationRecord::open(
            self.event.id,
            volunteer_id,
            initial,
            now,
        ));
        Ok(&self.participations[self.participations.len() - 1])
    }

    /// Move the volunteer's active record to `target`, returning the previous status.
    ///
    /// Moving into a seat-holding status is refused when no seat is free.
    pub fn transition_participation(
        &mut self,
        volunteer_id: VolunteerId,
        target: ParticipationStatus,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ParticipationStatus> {
        let event_id = self.event.id;
        let index = self
            .participations
            .iter()
            .position(|p| p.volunteer_id == volunteer_id && p.is_active())
            .ok_or_else(|| VolunteerError::participation_not_found(event_id, volunteer_id))?;

        let current = self.participations[index].status;
        if target.holds_seat() && !current.holds_seat() && !self.has_free_seat() {
            return Err(VolunteerError::EventFull { event_id });
        }

        let from = self.participations[index].transition_to(target, reason, now)?;
        Ok(from)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.event.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEvent;
    use chrono::Duration;

    fn roster(capacity: u32) -> EventRoster {
        let now = Utc::now();
        let event = NewEvent {
            title: "River cleanup".to_string(),
            capacity,
            waitlist_enabled: true,
            max_waitlist_size: 2,
            start_time: now + Duration::days(1),
        }
        .into_event(now)
        .unwrap();
        EventRoster::new(event)
    }

    #[test]
    fn test_open_participation_enforces_capacity() {
        let now = Utc::now();
        let mut roster = roster(1);
        roster
            .open_participation(VolunteerId::new(), ParticipationStatus::Registered, now)
            .unwrap();
        let err = roster
            .open_participation(VolunteerId::new(), ParticipationStatus::Registered, now)
            .unwrap_err();
        assert_eq!(err.code(), "event_full");
        assert_eq!(roster.seats_taken(), 1);
        assert_eq!(roster.free_seats(), 0);
    }

    #[test]
    fn test_single_active_record_per_volunteer() {
        let now = Utc::now();
        let mut roster = roster(3);
        let v = VolunteerId::new();
        roster
            .open_participation(v, ParticipationStatus::Registered, now)
            .unwrap();
        let err = roster
            .open_participation(v, ParticipationStatus::Waitlisted, now)
            .unwrap_err();
        assert_eq!(err.code(), "already_registered");
    }

    #[test]
    fn test_cancelled_record_allows_new_record() {
        let now = Utc::now();
        let mut roster = roster(3);
        let v = VolunteerId::new();
        roster
            .open_participation(v, ParticipationStatus::Registered, now)
            .unwrap();
        roster
            .transition_participation(v, ParticipationStatus::Cancelled, None, now)
            .unwrap();
        roster
            .open_participation(v, ParticipationStatus::Registered, now)
            .unwrap();

        assert_eq!(roster.participation_history(v).count(), 2);
        assert_eq!(roster.registered_volunteers(), vec![v]);
    }

    #[test]
    fn test_promotion_into_full_event_is_refused() {
        let now = Utc::now();
        let mut roster = roster(1);
        let waiting = VolunteerId::new();
        roster
            .open_participation(waiting, ParticipationStatus::Waitlisted, now)
            .unwrap();
        roster
            .open_participation(VolunteerId::new(), ParticipationStatus::Registered, now)
            .unwrap();

        let err = roster
            .transition_participation(waiting, ParticipationStatus::Registered, None, now)
            .unwrap_err();
        assert_eq!(err.code(), "event_full");
        assert_eq!(
            roster.active_participation(waiting).unwrap().status,
            ParticipationStatus::Waitlisted
        );
    }

    #[test]
    fn test_unoffered_seats_account_for_notified_entries() {
        let now = Utc::now();
        let mut roster = roster(2);
        let event_id = roster.event.id;
        roster
            .waitlist_mut()
            .join(event_id, VolunteerId::new(), now, 2)
            .unwrap();
        roster.waitlist_mut().notify_next(now, Duration::hours(24));

        assert_eq!(roster.free_seats(), 2);
        assert_eq!(roster.unoffered_seats(), 1);
    }
}
