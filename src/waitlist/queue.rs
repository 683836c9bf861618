//! # Waitlist Queue
//!
//! FIFO queue of waitlist entries for a single event.
//!
//! Active entries (`Waiting`, `Notified`) stay in join order; entries that
//! leave by expiry or promotion move to an archive so the roster keeps their
//! history. `leave` removes an entry outright.
//!
//! The queue is plain data. Callers mutate it while holding the event's lock
//! (see [`EventLockRegistry`](crate::locking::EventLockRegistry)).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolunteerError};
use crate::models::{EventId, VolunteerId, WaitlistEntry};
use crate::state_machine::WaitlistEntryStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitlistQueue {
    entries: Vec<WaitlistEntry>,
    archived: Vec<WaitlistEntry>,
    next_sequence: i64,
}

impl WaitlistQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from persisted entries, restoring join order
    pub fn from_entries(entries: Vec<WaitlistEntry>) -> Self {
        let (mut active, mut archived): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|e| e.status.is_active());
        active.sort_by_key(WaitlistEntry::queue_key);
        archived.sort_by_key(WaitlistEntry::queue_key);

        let next_sequence = active
            .iter()
            .chain(archived.iter())
            .map(|e| e.sequence)
            .max()
            .map_or(0, |max| max + 1);

        Self {
            entries: active,
            archived,
            next_sequence,
        }
    }

    /// Append a waiting entry for `volunteer_id`.
    ///
    /// `joined_at` is clamped to the last entry's timestamp so join order stays
    /// monotonic even when the clock steps backwards.
    pub fn join(
        &mut self,
        event_id: EventId,
        volunteer_id: VolunteerId,
        now: DateTime<Utc>,
        max_size: u32,
    ) -> Result<&WaitlistEntry> {
        if self.contains(volunteer_id) {
            return Err(VolunteerError::AlreadyRegistered {
                event_id,
                volunteer_id,
            });
        }
        if self.active_count() >= max_size as usize {
            return Err(VolunteerError::WaitlistFull { event_id, max_size });
        }

        let joined_at = self
            .entries
            .last()
            .map_or(now, |last| last.joined_at.max(now));
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.entries
            .push(WaitlistEntry::new(event_id, volunteer_id, joined_at, sequence));
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Remove the volunteer's active entry regardless of its status
    pub fn leave(&mut self, volunteer_id: VolunteerId) -> Option<WaitlistEntry> {
        let index = self.index_of(volunteer_id)?;
        Some(self.entries.remove(index))
    }

    /// 1-based rank among waiting entries, `None` when not waiting
    pub fn position(&self, volunteer_id: VolunteerId) -> Option<usize> {
        self.entries
            .iter()
            .filter(|e| e.is_waiting())
            .position(|e| e.volunteer_id == volunteer_id)
            .map(|index| index + 1)
    }

    /// The waiting entry that joined first
    pub fn next_eligible(&self) -> Option<&WaitlistEntry> {
        self.entries.iter().find(|e| e.is_waiting())
    }

    pub fn entry(&self, volunteer_id: VolunteerId) -> Option<&WaitlistEntry> {
        self.entries.iter().find(|e| e.volunteer_id == volunteer_id)
    }

    pub fn contains(&self, volunteer_id: VolunteerId) -> bool {
        self.index_of(volunteer_id).is_some()
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_waiting()).count()
    }

    /// Outstanding seat offers
    pub fn notified_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_notified()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active entries in join order
    pub fn entries(&self) -> &[WaitlistEntry] {
        &self.entries
    }

    /// Expired and promoted entries, oldest first
    pub fn archived(&self) -> &[WaitlistEntry] {
        &self.archived
    }

    /// Every entry, active and archived, for persistence
    pub fn all_entries(&self) -> impl Iterator<Item = &WaitlistEntry> {
        self.entries.iter().chain(self.archived.iter())
    }

    /// Offer a seat to the next waiting entry; returns the notified entry
    pub fn notify_next(&mut self, now: DateTime<Utc>, window: Duration) -> Option<&WaitlistEntry> {
        let index = self.entries.iter().position(|e| e.is_waiting())?;
        self.entries[index].notify(now, window);
        Some(&self.entries[index])
    }

    /// Offer a seat to a specific waiting entry
    pub fn notify(
        &mut self,
        volunteer_id: VolunteerId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Option<&WaitlistEntry> {
        let index = self.index_of(volunteer_id)?;
        self.entries[index].notify(now, window);
        Some(&self.entries[index])
    }

    /// Put a notified entry back in line at its original position
    pub fn revert_to_waiting(&mut self, volunteer_id: VolunteerId) -> bool {
        match self.index_of(volunteer_id) {
            Some(index) => {
                self.entries[index].reset_to_waiting();
                true
            }
            None => false,
        }
    }

    /// Move the entry out of the queue as promoted
    pub fn mark_promoted(&mut self, volunteer_id: VolunteerId) -> Option<WaitlistEntry> {
        self.archive(volunteer_id, WaitlistEntryStatus::Promoted)
    }

    /// Move the entry out of the queue as expired
    pub fn mark_expired(&mut self, volunteer_id: VolunteerId) -> Option<WaitlistEntry> {
        self.archive(volunteer_id, WaitlistEntryStatus::Expired)
    }

    /// Volunteers whose offers lapsed before `now`
    pub fn expired_offers(&self, now: DateTime<Utc>) -> Vec<VolunteerId> {
        self.entries
            .iter()
            .filter(|e| e.is_offer_expired(now))
            .map(|e| e.volunteer_id)
            .collect()
    }

    /// Earliest deadline among outstanding offers
    pub fn earliest_offer_deadline(&self) -> Option<DateTime<Utc>> {
        self.entries
            .iter()
            .filter(|e| e.is_notified())
            .filter_map(|e| e.expires_at)
            .min()
    }

    /// Remove every active entry, returning them in join order
    pub fn drain_active(&mut self) -> Vec<WaitlistEntry> {
        std::mem::take(&mut self.entries)
    }

    fn archive(
        &mut self,
        volunteer_id: VolunteerId,
        status: WaitlistEntryStatus,
    ) -> Option<WaitlistEntry> {
        let index = self.index_of(volunteer_id)?;
        let mut entry = self.entries.remove(index);
        entry.status = status;
        self.archived.push(entry.clone());
        Some(entry)
    }

    fn index_of(&self, volunteer_id: VolunteerId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.volunteer_id == volunteer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(volunteers: &[VolunteerId], now: DateTime<Utc>) -> (EventId, WaitlistQueue) {
        let event_id = EventId::new();
        let mut queue = WaitlistQueue::new();
        for (i, v) in volunteers.iter().enumerate() {
            queue
                .join(event_id, *v, now + Duration::seconds(i as i64), 10)
                .unwrap();
        }
        (event_id, queue)
    }

    #[test]
    fn test_positions_follow_join_order() {
        let now = Utc::now();
        let vs: Vec<VolunteerId> = (0..3).map(|_| VolunteerId::new()).collect();
        let (_, queue) = queue_with(&vs, now);

        assert_eq!(queue.position(vs[0]), Some(1));
        assert_eq!(queue.position(vs[1]), Some(2));
        assert_eq!(queue.position(vs[2]), Some(3));
        assert_eq!(queue.position(VolunteerId::new()), None);
        assert_eq!(queue.next_eligible().unwrap().volunteer_id, vs[0]);
    }

    #[test]
    fn test_join_rejects_when_full() {
        let now = Utc::now();
        let event_id = EventId::new();
        let mut queue = WaitlistQueue::new();
        queue.join(event_id, VolunteerId::new(), now, 1).unwrap();

        let err = queue.join(event_id, VolunteerId::new(), now, 1).unwrap_err();
        assert!(matches!(err, VolunteerError::WaitlistFull { max_size: 1, .. }));
    }

    #[test]
    fn test_zero_max_size_rejects_every_join() {
        let mut queue = WaitlistQueue::new();
        let err = queue
            .join(EventId::new(), VolunteerId::new(), Utc::now(), 0)
            .unwrap_err();
        assert_eq!(err.code(), "waitlist_full");
    }

    #[test]
    fn test_duplicate_join_is_rejected() {
        let now = Utc::now();
        let v = VolunteerId::new();
        let (event_id, mut queue) = queue_with(&[v], now);
        let err = queue.join(event_id, v, now, 10).unwrap_err();
        assert_eq!(err.code(), "already_registered");
    }

    #[test]
    fn test_leave_keeps_remaining_order() {
        let now = Utc::now();
        let vs: Vec<VolunteerId> = (0..3).map(|_| VolunteerId::new()).collect();
        let (_, mut queue) = queue_with(&vs, now);

        assert!(queue.leave(vs[1]).is_some());
        assert!(queue.leave(vs[1]).is_none());
        assert_eq!(queue.position(vs[0]), Some(1));
        assert_eq!(queue.position(vs[2]), Some(2));
    }

    #[test]
    fn test_notified_entries_have_no_position() {
        let now = Utc::now();
        let vs: Vec<VolunteerId> = (0..2).map(|_| VolunteerId::new()).collect();
        let (_, mut queue) = queue_with(&vs, now);

        let notified = queue.notify_next(now, Duration::hours(24)).unwrap();
        assert_eq!(notified.volunteer_id, vs[0]);
        assert_eq!(queue.position(vs[0]), None);
        assert_eq!(queue.position(vs[1]), Some(1));
        assert_eq!(queue.next_eligible().unwrap().volunteer_id, vs[1]);
        assert_eq!(queue.notified_count(), 1);
        assert_eq!(queue.active_count(), 2);
    }

    #[test]
    fn test_revert_restores_original_rank() {
        let now = Utc::now();
        let vs: Vec<VolunteerId> = (0..2).map(|_| VolunteerId::new()).collect();
        let (_, mut queue) = queue_with(&vs, now);

        queue.notify_next(now, Duration::hours(24));
        assert!(queue.revert_to_waiting(vs[0]));
        assert_eq!(queue.position(vs[0]), Some(1));
    }

    #[test]
    fn test_expiry_archives_entry() {
        let now = Utc::now();
        let v = VolunteerId::new();
        let (_, mut queue) = queue_with(&[v], now);

        queue.notify_next(now, Duration::hours(24));
        assert!(queue.expired_offers(now + Duration::hours(24)).is_empty());
        let expired = queue.expired_offers(now + Duration::hours(25));
        assert_eq!(expired, vec![v]);

        let entry = queue.mark_expired(v).unwrap();
        assert_eq!(entry.status, WaitlistEntryStatus::Expired);
        assert!(queue.is_empty());
        assert_eq!(queue.archived().len(), 1);
    }

    #[test]
    fn test_backwards_clock_keeps_order_monotonic() {
        let now = Utc::now();
        let event_id = EventId::new();
        let mut queue = WaitlistQueue::new();
        let first = VolunteerId::new();
        let second = VolunteerId::new();
        queue.join(event_id, first, now, 5).unwrap();
        queue
            .join(event_id, second, now - Duration::minutes(5), 5)
            .unwrap();

        let entries = queue.entries();
        assert!(entries[0].joined_at <= entries[1].joined_at);
        assert_eq!(queue.position(second), Some(2));
    }

    #[test]
    fn test_from_entries_restores_order_and_sequence() {
        let now = Utc::now();
        let vs: Vec<VolunteerId> = (0..3).map(|_| VolunteerId::new()).collect();
        let (event_id, mut queue) = queue_with(&vs, now);
        queue.notify_next(now, Duration::hours(1));
        queue.mark_promoted(vs[0]);

        let mut persisted: Vec<WaitlistEntry> = queue.all_entries().cloned().collect();
        persisted.reverse();
        let mut restored = WaitlistQueue::from_entries(persisted);

        assert_eq!(restored.position(vs[1]), Some(1));
        assert_eq!(restored.archived().len(), 1);
        let joined = restored
            .join(event_id, VolunteerId::new(), now + Duration::minutes(1), 10)
            .unwrap();
        assert_eq!(joined.sequence, 3);
    }
}
