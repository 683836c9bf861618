use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EventId, VolunteerId};
use crate::state_machine::WaitlistEntryStatus;

/// A queued request for a seat, ordered by `(joined_at, sequence)`.
///
/// `notified_at` and `expires_at` are populated only while the entry is (or was
/// last) `Notified`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub event_id: EventId,
    pub volunteer_id: VolunteerId,
    pub joined_at: DateTime<Utc>,
    /// Tie-breaker for entries sharing a timestamp
    pub sequence: i64,
    pub status: WaitlistEntryStatus,
    pub notified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl WaitlistEntry {
    pub fn new(
        event_id: EventId,
        volunteer_id: VolunteerId,
        joined_at: DateTime<Utc>,
        sequence: i64,
    ) -> Self {
        Self {
            event_id,
            volunteer_id,
            joined_at,
            sequence,
            status: WaitlistEntryStatus::Waiting,
            notified_at: None,
            expires_at: None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == WaitlistEntryStatus::Waiting
    }

    pub fn is_notified(&self) -> bool {
        self.status == WaitlistEntryStatus::Notified
    }

    /// A notified entry whose acceptance window closed before `now`
    pub fn is_offer_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_notified() && self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    pub(crate) fn notify(&mut self, now: DateTime<Utc>, window: Duration) {
        self.status = WaitlistEntryStatus::Notified;
        self.notified_at = Some(now);
        self.expires_at = Some(now + window);
    }

    pub(crate) fn reset_to_waiting(&mut self) {
        self.status = WaitlistEntryStatus::Waiting;
        self.notified_at = None;
        self.expires_at = None;
    }

    pub(crate) fn queue_key(&self) -> (DateTime<Utc>, i64) {
        (self.joined_at, self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_sets_window() {
        let now = Utc::now();
        let mut entry = WaitlistEntry::new(EventId::new(), VolunteerId::new(), now, 1);
        entry.notify(now, Duration::hours(24));
        assert!(entry.is_notified());
        assert_eq!(entry.expires_at, Some(now + Duration::hours(24)));
        assert!(!entry.is_offer_expired(now + Duration::hours(24)));
        assert!(entry.is_offer_expired(now + Duration::hours(24) + Duration::seconds(1)));
    }

    #[test]
    fn test_reset_clears_window() {
        let now = Utc::now();
        let mut entry = WaitlistEntry::new(EventId::new(), VolunteerId::new(), now, 1);
        entry.notify(now, Duration::hours(1));
        entry.reset_to_waiting();
        assert!(entry.is_waiting());
        assert_eq!(entry.notified_at, None);
        assert_eq!(entry.expires_at, None);
    }
}
