#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Volunteer Core Rust
//!
//! Event capacity, waitlist and promotion engine for volunteer coordination.
//!
//! ## Overview
//!
//! Volunteers register for events with a fixed number of seats. When an event is
//! full, requests queue on a strictly ordered waitlist. Freed seats are offered to
//! the next waiting volunteer with a time-limited acceptance window; offers that
//! lapse are expired by a periodic sweep and passed down the line.
//!
//! ## Architecture
//!
//! Every capacity-mutating operation runs under a **per-event lock** from the
//! [`locking::EventLockRegistry`]: load the roster, mutate it with pure logic,
//! save it with an optimistic version check, release the lock, then deliver
//! notifications. Unrelated events never block each other.
//!
//! ## Key Features
//!
//! - **Capacity Invariant**: registered count never exceeds capacity, even under
//!   concurrent requests
//! - **FIFO Waitlist**: positions always follow join order
//! - **Explicit Accept-or-Expire Promotion**: 24 hour acceptance window by default
//! - **Event Lifecycle State Machine**: guarded transitions between
//!   pending/approved/full/cancelled/completed
//! - **Audit Trail**: participation records are never deleted; every change is
//!   a recorded transition
//!
//! ## Module Organization
//!
//! - [`models`] - Events, participation records, waitlist entries, rosters
//! - [`state_machine`] - Event and participation lifecycles
//! - [`waitlist`] - FIFO waitlist queue
//! - [`services`] - Capacity manager, promotion controller, sweeper, lifecycle
//! - [`store`] - Persistence (PostgreSQL and in-memory)
//! - [`notifications`] - Notification gateway and dispatcher
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`events`] - Lifecycle event publishing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use volunteer_core::{
//!     NewEvent, TracingNotificationGateway, VolunteerConfig, VolunteerCoordinator, VolunteerId,
//! };
//!
//! # async fn example() -> volunteer_core::Result<()> {
//! let coordinator = VolunteerCoordinator::in_memory(
//!     VolunteerConfig::default(),
//!     Arc::new(TracingNotificationGateway),
//! );
//!
//! let event = coordinator
//!     .create_event(NewEvent {
//!         title: "Beach cleanup".to_string(),
//!         capacity: 20,
//!         waitlist_enabled: true,
//!         max_waitlist_size: 10,
//!         start_time: chrono::Utc::now() + chrono::Duration::days(3),
//!     })
//!     .await?;
//! coordinator.lifecycle().approve(event.id).await?;
//!
//! let outcome = coordinator.register(event.id, VolunteerId::new()).await?;
//! println!("registration outcome: {outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod locking;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod services;
pub mod state_machine;
pub mod store;
pub mod system_context;
pub mod test_helpers;
pub mod waitlist;

pub use clock::{Clock, SystemClock};
pub use config::VolunteerConfig;
pub use constants::{status_groups, system};
// Re-export constants events with different name to avoid conflict
pub use constants::events as lifecycle_events;
pub use error::{Result, VolunteerError};
pub use models::{Event, EventId, EventRoster, NewEvent, VolunteerId};
pub use notifications::{NotificationGateway, NotificationKind, TracingNotificationGateway};
pub use services::{
    CapacityManager, EventLifecycleService, ExpirySweeper, PromotionController,
    RegistrationOutcome, SweepReport, VolunteerCoordinator, WaitlistStatus,
};
pub use state_machine::{EventStatus, ParticipationStatus, WaitlistEntryStatus};
pub use store::{EventSession, EventStore, InMemoryEventStore, PgEventStore};
pub use system_context::SystemContext;
