//! A stand-in for the document service: one JSON file per document.

use async_trait::async_trait;
use draftsafe_sdk::{ContentValue, DocumentId, PersistError, Persistence, ValidationIssue};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct DirectoryPersistence {
    root: PathBuf,
    offline: AtomicBool,
}

impl DirectoryPersistence {
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            offline: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make every save fail as if the server were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Stored content of `document_id`, in whatever shape it was written.
    pub fn load(&self, document_id: &DocumentId) -> io::Result<Option<Value>> {
        if validate(document_id).is_err() {
            return Ok(None);
        }
        match std::fs::read(self.path_for(document_id)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn path_for(&self, document_id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}.json", document_id))
    }
}

fn validate(document_id: &DocumentId) -> Result<(), PersistError> {
    let id = document_id.as_str();
    let mut issues = Vec::new();
    if id.contains(['/', '\\']) || id.contains("..") {
        issues.push(ValidationIssue::new(
            "id",
            "Document id must not contain path separators",
        ));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(PersistError::Validation(issues))
    }
}

#[async_trait]
impl Persistence for DirectoryPersistence {
    async fn persist(
        &self,
        document_id: &DocumentId,
        content: &ContentValue,
    ) -> Result<(), PersistError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("Server unreachable".into()));
        }
        validate(document_id)?;

        let bytes = serde_json::to_vec_pretty(content.as_json())
            .map_err(|e| PersistError::Validation(vec![ValidationIssue::new("content", e.to_string())]))?;
        let path = self.path_for(document_id);
        let tmp = path.with_extension("json.tmp");

        let unavailable = |e: io::Error| PersistError::Unavailable(e.to_string());
        tokio::fs::write(&tmp, bytes).await.map_err(unavailable)?;
        tokio::fs::rename(&tmp, &path).await.map_err(unavailable)?;
        Ok(())
    }
}
