use crate::store::StoreFailure;
use crate::utils::IsTransient;

// ============================================================================
// Event Catalog Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Event title cannot be empty")]
    EmptyTitle,

    #[error("Invalid time range for {field}: start must be before end")]
    InvalidTimeRange { field: &'static str },

    #[error(transparent)]
    Store(#[from] StoreFailure),
}

impl IsTransient for CatalogError {
    fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Store(failure) if failure.is_transient())
    }
}
