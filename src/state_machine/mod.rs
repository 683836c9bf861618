// State machine module for event capacity management
//
// Event lifecycle (pending -> approved/full -> cancelled/completed) and the
// participation record lifecycle, with guards for capacity-driven transitions.

pub mod errors;
pub mod event_state_machine;
pub mod events;
pub mod guards;
pub mod participation_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{GuardError, StateMachineError, StateMachineResult};
pub use event_state_machine::{AppliedTransition, EventStateMachine};
pub use events::EventLifecycleEvent;
pub use participation_state_machine::ParticipationStateMachine;
pub use states::{EventStatus, ParticipationStatus, WaitlistEntryStatus};

// Common traits and utilities
pub use guards::StateGuard;
