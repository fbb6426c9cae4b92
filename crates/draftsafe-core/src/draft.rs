//! Local draft records kept for crash and reload recovery.

use crate::clock::Millis;
use crate::content::ContentValue;
use crate::document::DocumentId;
use serde::{Deserialize, Serialize};

/// Prefix of every draft key in the local cache.
pub const DRAFT_KEY_PREFIX: &str = "draft_";

/// The most recent unsaved content of one document.
///
/// Only one draft per document exists at a time; writing a new one replaces
/// the previous entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDraft {
    pub content: ContentValue,
    /// Epoch milliseconds at which the draft was written.
    pub timestamp: Millis,
    pub document_id: String,
}

impl LocalDraft {
    pub fn new(document_id: &DocumentId, content: ContentValue, timestamp: Millis) -> Self {
        Self {
            content,
            timestamp,
            document_id: document_id.as_str().to_string(),
        }
    }

    /// Cache key under which the draft for `document_id` lives.
    pub fn cache_key(document_id: &DocumentId) -> String {
        format!("{}{}", DRAFT_KEY_PREFIX, document_id)
    }

    pub fn belongs_to(&self, document_id: &DocumentId) -> bool {
        self.document_id == document_id.as_str()
    }

    /// Age at `now`. Timestamps in the future count as age zero.
    pub fn age_ms(&self, now: Millis) -> Millis {
        now.saturating_sub(self.timestamp)
    }

    /// Whether the draft is recent enough to offer for recovery.
    pub fn is_fresh(&self, now: Millis, window_ms: Millis) -> bool {
        self.age_ms(now) < window_ms
    }
}

/// Result of looking for a local draft.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DraftCheck {
    pub has_local_draft: bool,
    pub draft: Option<ContentValue>,
    pub timestamp: Option<Millis>,
}

impl DraftCheck {
    pub fn none() -> Self {
        Self::default()
    }
}

impl From<LocalDraft> for DraftCheck {
    fn from(draft: LocalDraft) -> Self {
        Self {
            has_local_draft: true,
            draft: Some(draft.content),
            timestamp: Some(draft.timestamp),
        }
    }
}
