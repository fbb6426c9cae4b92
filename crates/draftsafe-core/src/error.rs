//! Error types for the core model.

use thiserror::Error;

/// Errors raised while building core values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("Cannot save: Missing document ID")]
    MissingDocumentId,

    #[error("Document ID is {len} bytes long, the limit is {max}")]
    DocumentIdTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, ContentError>;
