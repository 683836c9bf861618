use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::VolunteerConfig;
use crate::events::EventPublisher;
use crate::locking::EventLockRegistry;
use crate::notifications::{NotificationDispatcher, NotificationGateway, TracingNotificationGateway};
use crate::store::{EventStore, InMemoryEventStore, PgEventStore};

/// Shared system dependencies and configuration
///
/// Dependency container handed to every service:
/// - Event store (PostgreSQL or in-memory)
/// - Per-event lock registry
/// - Time source
/// - Notification dispatcher
/// - Lifecycle event publisher
#[derive(Debug, Clone)]
pub struct SystemContext {
    /// System instance ID
    pub system_id: Uuid,

    pub config: Arc<VolunteerConfig>,

    pub store: Arc<dyn EventStore>,

    /// Serializes mutations per event
    pub locks: Arc<EventLockRegistry>,

    pub clock: Arc<dyn Clock>,

    pub notifier: NotificationDispatcher,

    pub event_publisher: EventPublisher,
}

impl SystemContext {
    /// Assemble a context around an existing store and gateway, using wall-clock time
    pub fn new(
        config: VolunteerConfig,
        store: Arc<dyn EventStore>,
        gateway: Arc<dyn NotificationGateway>,
    ) -> Self {
        let notifier = NotificationDispatcher::new(gateway, config.notification_timeout());
        let event_publisher = EventPublisher::new(config.events.channel_capacity);
        let system_id = Uuid::new_v4();

        info!(
            system_id = %system_id,
            acceptance_window_hours = config.waitlist.acceptance_window_hours,
            "Volunteer system context initialized"
        );

        Self {
            system_id,
            config: Arc::new(config),
            store,
            locks: Arc::new(EventLockRegistry::new()),
            clock: Arc::new(SystemClock),
            notifier,
            event_publisher,
        }
    }

    /// Context backed by PostgreSQL with log-only notifications
    pub fn with_pool(pool: PgPool, config: VolunteerConfig) -> Self {
        Self::new(
            config,
            Arc::new(PgEventStore::new(pool)),
            Arc::new(TracingNotificationGateway),
        )
    }

    /// Context backed by the process-local store
    pub fn in_memory(config: VolunteerConfig, gateway: Arc<dyn NotificationGateway>) -> Self {
        Self::new(config, Arc::new(InMemoryEventStore::new()), gateway)
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}
