//! Per-event critical section shared by every mutating service.
//!
//! Sequence for one operation:
//! 1. acquire the event's in-process lock, then the store's exclusive session
//! 2. load the roster
//! 3. run the synchronous mutation, collecting side effects in an [`Outbox`]
//! 4. save and commit when the roster changed
//! 5. release the session and the lock
//! 6. queue notifications for background delivery and publish lifecycle events
//!
//! A failed mutation discards its changes unless it asked to keep them with
//! [`Outbox::keep_changes_on_error`].

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

use crate::constants::events;
use crate::error::{Result, VolunteerError};
use crate::models::{EventId, EventRoster, VolunteerId};
use crate::notifications::{Notification, NotificationKind};
use crate::state_machine::EventStatus;
use crate::system_context::SystemContext;

/// Side effects collected while the lock is held
#[derive(Debug, Default)]
pub struct Outbox {
    notifications: Vec<Notification>,
    events: Vec<(&'static str, Value)>,
    keep_changes: bool,
}

impl Outbox {
    pub fn notify(&mut self, volunteer_id: VolunteerId, event_id: EventId, kind: NotificationKind) {
        self.notifications
            .push(Notification::new(volunteer_id, event_id, kind));
    }

    pub fn publish(&mut self, name: &'static str, context: Value) {
        self.events.push((name, context));
    }

    /// Record an event status change for the lifecycle event stream
    pub fn status_changed(&mut self, event_id: EventId, from: EventStatus, to: EventStatus) {
        self.publish(
            events::EVENT_STATUS_CHANGED,
            json!({ "event_id": event_id, "from": from, "to": to }),
        );
    }

    /// Persist the roster even though the operation reports an error
    pub fn keep_changes_on_error(&mut self) {
        self.keep_changes = true;
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(|(name, _)| *name).collect()
    }

    fn release(self, context: &SystemContext) {
        context.notifier.enqueue(self.notifications);
        for (name, payload) in self.events {
            context.event_publisher.publish(name, payload);
        }
    }
}

/// Run `mutation` against the event's roster under its lock
pub async fn run_exclusive<T, F>(
    context: &SystemContext,
    event_id: EventId,
    operation: &'static str,
    mutation: F,
) -> Result<T>
where
    F: FnOnce(&mut EventRoster, DateTime<Utc>, &mut Outbox) -> Result<T>,
{
    let guard = context.locks.acquire(event_id).await;
    let mut session = context.store.begin_exclusive(event_id).await?;

    let mut roster = session
        .load()
        .await?
        .ok_or_else(|| VolunteerError::event_not_found(event_id))?;
    let original = roster.clone();
    let now = context.now();
    let mut outbox = Outbox::default();

    let result = mutation(&mut roster, now, &mut outbox);
    let persist = result.is_ok() || outbox.keep_changes;

    if persist && roster != original {
        roster.touch(now);
        let version = session.save(&roster).await?;
        session.commit().await?;
        debug!(
            event_id = %event_id,
            operation = operation,
            version = version,
            "Roster saved"
        );
    } else {
        drop(session);
    }
    drop(guard);

    if persist {
        outbox.release(context);
    }
    result
}

/// Load a roster for reading, without taking the lock
pub async fn load_roster(context: &SystemContext, event_id: EventId) -> Result<EventRoster> {
    context
        .store
        .load(event_id)
        .await?
        .ok_or_else(|| VolunteerError::event_not_found(event_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolunteerConfig;
    use crate::state_machine::ParticipationStatus;
    use crate::test_helpers::{EventFactory, RecordingNotificationGateway};
    use std::sync::Arc;

    async fn context_with_event() -> (SystemContext, Arc<RecordingNotificationGateway>, EventId) {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        let context = SystemContext::in_memory(VolunteerConfig::default(), gateway.clone());
        let roster = EventFactory::new().approved().build();
        let event_id = roster.event.id;
        context.store.insert(&roster).await.unwrap();
        (context, gateway, event_id)
    }

    #[tokio::test]
    async fn test_failed_mutation_is_discarded() {
        let (context, gateway, event_id) = context_with_event().await;
        let volunteer = VolunteerId::new();

        let result: Result<()> = run_exclusive(&context, event_id, "test", |roster, now, outbox| {
            roster.open_participation(volunteer, ParticipationStatus::Registered, now)?;
            outbox.notify(volunteer, roster.event.id, NotificationKind::PromotionConfirmed);
            Err(VolunteerError::ValidationError("boom".to_string()))
        })
        .await;

        assert!(result.is_err());
        let roster = load_roster(&context, event_id).await.unwrap();
        assert_eq!(roster.seats_taken(), 0);
        assert_eq!(roster.event.version, 0);
        context.notifier.wait_idle().await;
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_kept_changes_survive_error() {
        let (context, gateway, event_id) = context_with_event().await;
        let volunteer = VolunteerId::new();

        let result: Result<()> = run_exclusive(&context, event_id, "test", |roster, now, outbox| {
            roster.open_participation(volunteer, ParticipationStatus::Registered, now)?;
            outbox.notify(volunteer, roster.event.id, NotificationKind::PromotionConfirmed);
            outbox.keep_changes_on_error();
            Err(VolunteerError::ValidationError("boom".to_string()))
        })
        .await;

        assert!(result.is_err());
        let roster = load_roster(&context, event_id).await.unwrap();
        assert_eq!(roster.seats_taken(), 1);
        context.notifier.wait_idle().await;
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_roster_is_not_saved() {
        let (context, _gateway, event_id) = context_with_event().await;
        run_exclusive(&context, event_id, "noop", |_, _, _| Ok(()))
            .await
            .unwrap();
        let roster = load_roster(&context, event_id).await.unwrap();
        assert_eq!(roster.event.version, 0);
    }

    #[tokio::test]
    async fn test_status_change_reaches_event_stream() {
        let (context, _gateway, event_id) = context_with_event().await;
        let mut receiver = context.event_publisher.subscribe();

        run_exclusive(&context, event_id, "status", |roster, _, outbox| {
            outbox.status_changed(roster.event.id, EventStatus::Approved, EventStatus::Full);
            Ok(())
        })
        .await
        .unwrap();

        let published = receiver.try_recv().unwrap();
        assert_eq!(published.name, events::EVENT_STATUS_CHANGED);
        assert_eq!(published.context["from"], "approved");
        assert_eq!(published.context["to"], "full");
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let (context, _gateway, _) = context_with_event().await;
        let err = run_exclusive(&context, EventId::new(), "noop", |_, _, _| Ok(()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
