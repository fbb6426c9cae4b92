//! Error types for the auto-save SDK.

use crate::persistence::PersistError;
use thiserror::Error;

/// Error returned by coordinator operations.
///
/// Every error is also recorded in the coordinator's `SaveStatus`; callers
/// that only watch the status may ignore the returned value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveError {
    #[error("Cannot save: Missing document ID")]
    MissingDocumentId,

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("Coordinator has been disposed")]
    Disposed,
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, AutoSaveError>;
