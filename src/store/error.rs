use crate::utils::{IsTransient, RetryResult};

// ============================================================================
// Store Errors
// ============================================================================
//
// Transient: timeouts, contention, quota, unavailability. Safe to retry
// because every write the domain issues is idempotent.
// Permanent: undecodable records, malformed requests.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation timed out: {0}")]
    Timeout(String),

    #[error("Write contention on entity group {0}")]
    Contention(String),

    #[error("Store quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Record at {key} could not be decoded: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Invalid store request: {0}")]
    InvalidRequest(String),
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_)
                | StoreError::Timeout(_)
                | StoreError::Contention(_)
                | StoreError::QuotaExceeded(_)
        )
    }
}

/// A store operation that still failed after going through the retry policy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreFailure {
    #[error("Store still failing after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("Permanent store failure: {0}")]
    Permanent(#[source] StoreError),
}

impl IsTransient for StoreFailure {
    fn is_transient(&self) -> bool {
        matches!(self, StoreFailure::Exhausted { .. })
    }
}

impl From<StoreError> for StoreFailure {
    fn from(error: StoreError) -> Self {
        StoreFailure::Permanent(error)
    }
}

impl<T> RetryResult<T, StoreError> {
    pub fn into_result(self) -> Result<T, StoreFailure> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed { error, attempts } => Err(StoreFailure::Exhausted {
                attempts,
                source: error,
            }),
            RetryResult::PermanentFailure(error) => Err(StoreFailure::Permanent(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Timeout("get".into()).is_transient());
        assert!(StoreError::Contention("Member:u1".into()).is_transient());
        assert!(!StoreError::InvalidRequest("empty kind".into()).is_transient());
        assert!(!StoreError::Corrupt {
            key: "Member:u1".into(),
            reason: "missing field".into(),
        }
        .is_transient());
    }

    #[test]
    fn test_retry_result_conversion() {
        let exhausted: RetryResult<(), StoreError> = RetryResult::Failed {
            error: StoreError::Timeout("get".into()),
            attempts: 3,
        };
        let failure = exhausted.into_result().unwrap_err();
        assert!(failure.is_transient());
        assert!(matches!(failure, StoreFailure::Exhausted { attempts: 3, .. }));

        let permanent: RetryResult<(), StoreError> =
            RetryResult::PermanentFailure(StoreError::InvalidRequest("bad".into()));
        assert!(!permanent.into_result().unwrap_err().is_transient());
    }
}
