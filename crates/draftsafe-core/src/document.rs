//! Document identity.

use crate::error::{ContentError, Result};
use serde::{Deserialize, Serialize};

/// Longest accepted id, in bytes.
///
/// Ids end up inside cache file names, where every non-alphanumeric byte can
/// take three characters; this keeps `draft_<id>.json` under the 255-byte
/// file name limit of common filesystems.
pub const MAX_DOCUMENT_ID_LEN: usize = 64;

/// Identifier of the document being edited.
///
/// Always non-empty, trimmed and at most [`MAX_DOCUMENT_ID_LEN`] bytes. An id
/// that is blank after trimming is the "missing document identity" case and
/// cannot be constructed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ContentError::MissingDocumentId);
        }
        if trimmed.len() > MAX_DOCUMENT_ID_LEN {
            return Err(ContentError::DocumentIdTooLong {
                len: trimmed.len(),
                max: MAX_DOCUMENT_ID_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ContentError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
