use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error, PartialEq)]
pub enum HarnessError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("Workload interrupted")]
    Interrupted,
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<StorageError> for HarnessError {
    fn from(err: StorageError) -> Self {
        // Point-lookup misses are swallowed at the call site; anything that
        // still propagates here means the backend itself failed.
        HarnessError::BackendUnavailable(err.to_string())
    }
}
