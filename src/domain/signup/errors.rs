use crate::domain::event::EventId;

/// Why an event cannot be signed up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidEventReason {
    NotFound,
    Inactive,
}

// ============================================================================
// Signup Errors
// ============================================================================
//
// A duplicate signup is not an error; see SignupOutcome::DuplicateSignup.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("Unauthorized: please sign in")]
    Unauthenticated,

    #[error("Event {event_id} is not open for signups ({reason:?})")]
    InvalidEvent {
        event_id: EventId,
        reason: InvalidEventReason,
    },

    #[error("Temporarily unable to complete signup: {0}")]
    RetryableFailure(String),

    #[error("Signup failed: {0}")]
    Internal(String),
}

impl SignupError {
    /// Label used for the `signup_outcomes_total` metric.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            SignupError::Unauthenticated => "unauthenticated",
            SignupError::InvalidEvent { .. } => "invalid_event",
            SignupError::RetryableFailure(_) => "retryable_failure",
            SignupError::Internal(_) => "internal",
        }
    }
}
