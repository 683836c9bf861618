//! Waitlist queue for full events.

pub mod queue;

pub use queue::WaitlistQueue;
