use crate::store::StoreFailure;
use crate::utils::IsTransient;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreFailure),
}

impl IsTransient for LedgerError {
    fn is_transient(&self) -> bool {
        match self {
            LedgerError::Store(failure) => failure.is_transient(),
        }
    }
}
