use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The client has no server URL / API key yet; network features are off.
    #[error("not configured: {0}")]
    Configuration(&'static str),
    /// User input is incomplete or invalid for the attempted action.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The action does not apply to the current state; nothing was changed.
    #[error("invalid operation: {0}")]
    Invariant(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
