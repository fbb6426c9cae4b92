//! The remote persistence contract.

use async_trait::async_trait;
use draftsafe_core::{ContentValue, DocumentId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One failed field check reported by the persistence service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: vec![path.into()],
            message: message.into(),
        }
    }
}

/// Why a remote save failed. The display text is what the user sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// The service rejected the payload.
    #[error("{}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// The service could not be reached or failed internally.
    #[error("{0}")]
    Unavailable(String),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    if issues.is_empty() {
        return "Failed to save".to_string();
    }
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Authoritative storage for document content.
///
/// Implementations must tolerate overlapping calls for the same document;
/// last write wins.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    async fn persist(
        &self,
        document_id: &DocumentId,
        content: &ContentValue,
    ) -> Result<(), PersistError>;
}

#[async_trait]
impl<P: Persistence + ?Sized> Persistence for Arc<P> {
    async fn persist(
        &self,
        document_id: &DocumentId,
        content: &ContentValue,
    ) -> Result<(), PersistError> {
        (**self).persist(document_id, content).await
    }
}

/// In-memory persistence for testing and simulation.
///
/// Records every call, keeps the latest content per document, and can be
/// scripted to fail.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    documents: RwLock<HashMap<DocumentId, ContentValue>>,
    calls: RwLock<Vec<(DocumentId, ContentValue)>>,
    scripted: Mutex<VecDeque<PersistError>>,
    outage: RwLock<Option<PersistError>>,
    latency: Option<Duration>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` (uses tokio time).
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Fail the next call with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, error: PersistError) {
        self.scripted.lock().push_back(error);
    }

    /// Fail every call with `error` until [`recover`](Self::recover).
    pub fn fail_always(&self, error: PersistError) {
        *self.outage.write() = Some(error);
    }

    pub fn recover(&self) {
        *self.outage.write() = None;
    }

    /// Every call made so far, successful or not.
    pub fn calls(&self) -> Vec<(DocumentId, ContentValue)> {
        self.calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    /// Content of the last successful save of `document_id`.
    pub fn latest(&self, document_id: &DocumentId) -> Option<ContentValue> {
        self.documents.read().get(document_id).cloned()
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn persist(
        &self,
        document_id: &DocumentId,
        content: &ContentValue,
    ) -> Result<(), PersistError> {
        self.calls
            .write()
            .push((document_id.clone(), content.clone()));

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self.scripted.lock().pop_front();
        if let Some(error) = scripted.or_else(|| self.outage.read().clone()) {
            return Err(error);
        }

        self.documents
            .write()
            .insert(document_id.clone(), content.clone());
        Ok(())
    }
}
