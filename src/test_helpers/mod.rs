// Test Helpers Module - shared fixtures for unit and integration tests
//
// Provides a controllable clock, recording/failing notification gateways and a
// builder for event rosters. Compiled into the library so integration tests
// and benches can use the same fixtures.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::time::Duration as StdDuration;

use crate::clock::Clock;
use crate::models::{EventId, EventRoster, NewEvent, VolunteerId};
use crate::notifications::{Notification, NotificationError, NotificationGateway, NotificationKind};
use crate::state_machine::EventStatus;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Gateway that remembers every delivered notification
#[derive(Debug, Default)]
pub struct RecordingNotificationGateway {
    sent: Mutex<Vec<Notification>>,
    delay: Option<StdDuration>,
}

impl RecordingNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before recording, to exercise dispatch timeouts
    pub fn with_delay(delay: StdDuration) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, volunteer_id: VolunteerId) -> Vec<NotificationKind> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.volunteer_id == volunteer_id)
            .map(|n| n.kind.clone())
            .collect()
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.kind.name() == name)
            .count()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotificationGateway {
    async fn notify(
        &self,
        volunteer_id: VolunteerId,
        event_id: EventId,
        kind: &NotificationKind,
    ) -> Result<(), NotificationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .push(Notification::new(volunteer_id, event_id, kind.clone()));
        Ok(())
    }
}

/// Gateway whose every delivery fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingNotificationGateway;

#[async_trait]
impl NotificationGateway for FailingNotificationGateway {
    async fn notify(
        &self,
        _volunteer_id: VolunteerId,
        _event_id: EventId,
        _kind: &NotificationKind,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::DeliveryFailed(
            "gateway unavailable".to_string(),
        ))
    }
}

/// Builder for events and rosters with sensible test defaults
#[derive(Debug, Clone)]
pub struct EventFactory {
    new_event: NewEvent,
    status: EventStatus,
    created_at: DateTime<Utc>,
}

impl EventFactory {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            new_event: NewEvent {
                title: "Community garden workday".to_string(),
                capacity: 2,
                waitlist_enabled: true,
                max_waitlist_size: 10,
                start_time: now + Duration::days(7),
            },
            status: EventStatus::Pending,
            created_at: now,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.new_event.title = title.to_string();
        self
    }

    pub fn capacity(mut self, capacity: u32) -> Self {
        self.new_event.capacity = capacity;
        self
    }

    pub fn waitlist(mut self, max_size: u32) -> Self {
        self.new_event.waitlist_enabled = true;
        self.new_event.max_waitlist_size = max_size;
        self
    }

    pub fn without_waitlist(mut self) -> Self {
        self.new_event.waitlist_enabled = false;
        self.new_event.max_waitlist_size = 0;
        self
    }

    pub fn starts_at(mut self, start_time: DateTime<Utc>) -> Self {
        self.new_event.start_time = start_time;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn approved(self) -> Self {
        self.status(EventStatus::Approved)
    }

    /// Force the stored status without walking the state machine
    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    /// The creation request, for service-level `create_event` calls
    pub fn new_event(&self) -> NewEvent {
        self.new_event.clone()
    }

    /// Panics on invalid input; test-only convenience.
    pub fn build(self) -> EventRoster {
        let mut event = self
            .new_event
            .into_event(self.created_at)
            .unwrap_or_else(|e| panic!("invalid test event: {e}"));
        event.status = self.status;
        EventRoster::new(event)
    }
}

impl Default for EventFactory {
    fn default() -> Self {
        Self::new()
    }
}
