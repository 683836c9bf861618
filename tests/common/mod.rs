//! Shared integration test harness: an in-memory coordinator driven by a
//! manual clock and a recording notification gateway.

#![allow(dead_code)] // Not every test binary uses every helper

pub mod strategies;

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use volunteer_core::models::{EventId, EventRoster, VolunteerId};
use volunteer_core::test_helpers::{EventFactory, ManualClock, RecordingNotificationGateway};
use volunteer_core::{SystemContext, VolunteerConfig, VolunteerCoordinator};

pub struct TestHarness {
    pub coordinator: VolunteerCoordinator,
    pub clock: Arc<ManualClock>,
    pub gateway: Arc<RecordingNotificationGateway>,
    pub start: DateTime<Utc>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(VolunteerConfig::default())
    }

    pub fn with_config(config: VolunteerConfig) -> Self {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let gateway = Arc::new(RecordingNotificationGateway::new());
        let context = SystemContext::in_memory(config, gateway.clone()).with_clock(clock.clone());

        Self {
            coordinator: VolunteerCoordinator::new(context),
            clock,
            gateway,
            start,
        }
    }

    /// Create and approve an event starting a week from the harness start
    pub async fn approved_event(&self, capacity: u32, max_waitlist_size: u32) -> EventId {
        self.event_from(
            EventFactory::new()
                .capacity(capacity)
                .waitlist(max_waitlist_size),
        )
        .await
    }

    pub async fn event_without_waitlist(&self, capacity: u32) -> EventId {
        self.event_from(EventFactory::new().capacity(capacity).without_waitlist())
            .await
    }

    pub async fn event_from(&self, factory: EventFactory) -> EventId {
        let factory = factory.starts_at(self.start + Duration::days(7));
        let event = self
            .coordinator
            .create_event(factory.new_event())
            .await
            .unwrap();
        self.coordinator.lifecycle().approve(event.id).await.unwrap();
        event.id
    }

    pub async fn roster(&self, event_id: EventId) -> EventRoster {
        self.coordinator.get_event(event_id).await.unwrap()
    }

    pub async fn registered(&self, event_id: EventId) -> Vec<VolunteerId> {
        self.coordinator
            .capacity()
            .registered_volunteers(event_id)
            .await
            .unwrap()
    }

    /// Wait for queued notifications to reach the recording gateway
    pub async fn notifications_delivered(&self) {
        self.coordinator.context().notifier.wait_idle().await;
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

pub fn volunteers(count: usize) -> Vec<VolunteerId> {
    (0..count).map(|_| VolunteerId::new()).collect()
}

/// Capacity invariant plus one active record per volunteer
pub fn assert_roster_invariants(roster: &EventRoster) {
    assert!(
        roster.seats_taken() <= roster.event.capacity,
        "seats taken {} exceed capacity {}",
        roster.seats_taken(),
        roster.event.capacity
    );

    let mut active: Vec<VolunteerId> = roster
        .participations()
        .iter()
        .filter(|p| p.is_active())
        .map(|p| p.volunteer_id)
        .collect();
    let total = active.len();
    active.sort();
    active.dedup();
    assert_eq!(active.len(), total, "volunteer with two active records");

    let waitlist = roster.waitlist();
    assert!(waitlist.active_count() <= roster.event.max_waitlist_size as usize);
    let keys: Vec<_> = waitlist
        .entries()
        .iter()
        .map(|e| (e.joined_at, e.sequence))
        .collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]), "waitlist out of join order");

    // Every queued volunteer holds a waitlisted record
    for entry in waitlist.entries() {
        let record = roster.active_participation(entry.volunteer_id);
        assert!(
            record.is_some_and(|p| p.status == volunteer_core::ParticipationStatus::Waitlisted),
            "queued volunteer without a waitlisted record"
        );
    }
}
