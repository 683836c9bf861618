//! # Participation Record Model
//!
//! One record per volunteer per event registration attempt, with a complete
//! transition history. Records are never deleted; cancellation is a status
//! transition like any other.
//!
//! ## Audit Trail
//!
//! Every status change appends a [`ParticipationTransition`] carrying the
//! previous state, the new state, a sequential `sort_key` and an optional reason.
//! The most recent transition always agrees with `status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::{EventId, VolunteerId};
use crate::state_machine::{ParticipationStateMachine, ParticipationStatus, StateMachineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub id: Uuid,
    pub event_id: EventId,
    pub volunteer_id: VolunteerId,
    pub status: ParticipationStatus,
    pub transitions: Vec<ParticipationTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single status change of a participation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationTransition {
    pub id: Uuid,
    pub from_state: Option<ParticipationStatus>,
    pub to_state: ParticipationStatus,
    pub sort_key: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ParticipationRecord {
    /// Open a new record in `initial` (registered or waitlisted)
    pub fn open(
        event_id: EventId,
        volunteer_id: VolunteerId,
        initial: ParticipationStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            volunteer_id,
            status: initial,
            transitions: vec![ParticipationTransition {
                id: Uuid::new_v4(),
                from_state: None,
                to_state: initial,
                sort_key: 1,
                reason: None,
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Apply a validated status change and append it to the audit trail
    pub fn transition_to(
        &mut self,
        target: ParticipationStatus,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> StateMachineResult<ParticipationStatus> {
        let from = self.status;
        ParticipationStateMachine::validate(from, target)?;

        let sort_key = self.transitions.last().map_or(1, |t| t.sort_key + 1);
        self.transitions.push(ParticipationTransition {
            id: Uuid::new_v4(),
            from_state: Some(from),
            to_state: target,
            sort_key,
            reason: reason.map(str::to_string),
            created_at: now,
        });
        self.status = target;
        self.updated_at = now;
        Ok(from)
    }

    pub fn most_recent_transition(&self) -> Option<&ParticipationTransition> {
        self.transitions.last()
    }
}
