//! # Services
//!
//! Capacity, waitlist promotion and event lifecycle operations. Each mutating
//! operation runs inside the per-event critical section in
//! [`critical_section`].

pub mod capacity_manager;
pub mod coordinator;
pub mod critical_section;
pub mod event_lifecycle;
pub mod expiry_sweeper;
pub mod promotion_controller;

pub use capacity_manager::{CapacityManager, RegistrationOutcome, WaitlistStatus};
pub use coordinator::VolunteerCoordinator;
pub use critical_section::Outbox;
pub use event_lifecycle::EventLifecycleService;
pub use expiry_sweeper::ExpirySweeper;
pub use promotion_controller::{ExpiryOutcome, PromotionController, SweepReport};
