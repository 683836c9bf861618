use super::{
    errors::{StateMachineError, StateMachineResult},
    states::ParticipationStatus,
};

/// Validates participation record transitions.
///
/// Waitlisted records may be promoted or cancelled; registered records may be
/// cancelled or resolved to attended/no-show. Cancelled, attended and no-show
/// are terminal.
pub struct ParticipationStateMachine;

impl ParticipationStateMachine {
    pub fn validate(from: ParticipationStatus, to: ParticipationStatus) -> StateMachineResult<()> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}
