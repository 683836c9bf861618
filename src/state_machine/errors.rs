use crate::error::VolunteerError;
use thiserror::Error;

/// Error types for state machine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Specific error type for guard condition failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    #[error("Business rule violation: {rule}")]
    BusinessRuleViolation { rule: String },

    #[error("Resource not available: {resource}")]
    ResourceUnavailable { resource: String },
}

impl From<GuardError> for StateMachineError {
    fn from(err: GuardError) -> Self {
        Self::GuardFailed {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type GuardResult<T> = Result<T, GuardError>;

/// Helper function to create business rule violations
pub fn business_rule_violation(rule: impl Into<String>) -> GuardError {
    GuardError::BusinessRuleViolation { rule: rule.into() }
}

/// Helper function to create resource availability failures
pub fn resource_unavailable(resource: impl Into<String>) -> GuardError {
    GuardError::ResourceUnavailable {
        resource: resource.into(),
    }
}

impl From<StateMachineError> for VolunteerError {
    fn from(err: StateMachineError) -> Self {
        match err {
            StateMachineError::InvalidTransition { from, to } => {
                VolunteerError::InvalidStatusTransition { from, to }
            }
            StateMachineError::GuardFailed { reason } => VolunteerError::GuardFailed { reason },
        }
    }
}

impl From<GuardError> for VolunteerError {
    fn from(err: GuardError) -> Self {
        VolunteerError::GuardFailed {
            reason: err.to_string(),
        }
    }
}
