use crate::store::StoreFailure;
use crate::utils::IsTransient;

use super::value_objects::MemberId;

// ============================================================================
// Identity Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Unauthorized: please sign in")]
    Unauthenticated,

    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    #[error(transparent)]
    Store(#[from] StoreFailure),
}

impl IsTransient for IdentityError {
    fn is_transient(&self) -> bool {
        matches!(self, IdentityError::Store(failure) if failure.is_transient())
    }
}
