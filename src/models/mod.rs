pub mod event;
pub mod ids;
pub mod participation;
pub mod roster;
pub mod waitlist_entry;

// Re-export core models for easy access
pub use event::{Event, NewEvent};
pub use ids::{EventId, VolunteerId};
pub use participation::{ParticipationRecord, ParticipationTransition};
pub use roster::EventRoster;
pub use waitlist_entry::WaitlistEntry;
