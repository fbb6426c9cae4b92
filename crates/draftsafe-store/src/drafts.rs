//! Typed access to `LocalDraft` records.

use crate::cache::KeyValueCache;
use crate::error::{CacheError, Result};
use draftsafe_core::{DocumentId, LocalDraft, DRAFT_KEY_PREFIX};

/// Reads and writes drafts through a [`KeyValueCache`].
#[derive(Debug)]
pub struct DraftStore<C: KeyValueCache> {
    cache: C,
}

impl<C: KeyValueCache> DraftStore<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Load the draft for `document_id`.
    ///
    /// An entry whose recorded document id differs from the one asked for is
    /// treated as absent.
    pub fn load(&self, document_id: &DocumentId) -> Result<Option<LocalDraft>> {
        let key = LocalDraft::cache_key(document_id);
        let Some(raw) = self.cache.get(&key)? else {
            return Ok(None);
        };
        let draft: LocalDraft = serde_json::from_str(&raw).map_err(|e| CacheError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        if !draft.belongs_to(document_id) {
            tracing::debug!(%key, owner = %draft.document_id, "ignoring draft for another document");
            return Ok(None);
        }
        Ok(Some(draft))
    }

    /// Write `draft`, replacing any earlier draft of the same document.
    pub fn store(&self, draft: &LocalDraft) -> Result<()> {
        let key = format!("{}{}", DRAFT_KEY_PREFIX, draft.document_id);
        let raw = serde_json::to_string(draft)?;
        self.cache.set(&key, &raw)
    }

    pub fn remove(&self, document_id: &DocumentId) -> Result<()> {
        self.cache.delete(&LocalDraft::cache_key(document_id))
    }

    /// Every readable draft in the cache. Corrupt entries are skipped.
    pub fn list(&self) -> Result<Vec<LocalDraft>> {
        let mut drafts = Vec::new();
        for key in self.cache.keys()? {
            let Some(id) = key.strip_prefix(DRAFT_KEY_PREFIX) else {
                continue;
            };
            let Ok(id) = DocumentId::parse(id) else {
                continue;
            };
            match self.load(&id) {
                Ok(Some(draft)) => drafts.push(draft),
                Ok(None) => {}
                Err(e) => tracing::warn!(%key, error = %e, "skipping unreadable draft"),
            }
        }
        drafts.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(drafts)
    }
}
