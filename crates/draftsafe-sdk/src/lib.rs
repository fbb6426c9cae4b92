//! Draftsafe SDK - document auto-save for editors
//!
//! Keeps a document's remote copy eventually consistent with rapid local
//! edits while protecting unsaved work across crashes and reloads.
//!
//! # Quick Start
//!
//! ```rust
//! use draftsafe_sdk::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let persistence = Arc::new(MemoryPersistence::new());
//! let clock = ManualClock::new(0);
//! let coordinator = AutoSaveCoordinator::new(
//!     "doc-1",
//!     persistence.clone(),
//!     MemoryCache::new(),
//!     clock.clone(),
//!     AutoSaveConfig::default(),
//! );
//!
//! coordinator.update_content(json!({ "text": "hello" }).into());
//!
//! // Two seconds of quiet: the draft is written, then the remote save runs.
//! clock.advance(1_000);
//! coordinator.tick().await;
//! clock.advance(1_000);
//! coordinator.tick().await;
//!
//! assert_eq!(persistence.call_count(), 1);
//! assert!(!coordinator.status().has_unsaved_changes);
//! # });
//! ```
//!
//! # Architecture
//!
//! - [`coordinator`] - The auto-save state machine and its events
//! - [`timer`] - Deadline-based debounce and interval timers
//! - [`persistence`] - The remote save contract and an in-memory implementation
//! - [`driver`] - Runs a coordinator's timers on tokio time
//! - [`config`] - Debounce, interval and freshness settings
//! - [`error`] - Error types

pub mod config;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod persistence;
pub mod timer;

// Re-exports for convenience
pub use config::{AutoSaveConfig, AutoSaveConfigBuilder};
pub use coordinator::{AutoSaveCoordinator, AutoSaveEvent, SaveTrigger, TickReport};
pub use driver::{spawn_driver, DriverHandle, TokioClock};
pub use error::{AutoSaveError, Result};
pub use persistence::{MemoryPersistence, PersistError, Persistence, ValidationIssue};

pub use draftsafe_core::{
    Clock, ContentValue, DocumentId, DraftCheck, LegacyContent, LocalDraft, ManualClock, Millis,
    SaveState, SaveStatus, SystemClock, MAX_DOCUMENT_ID_LEN,
};
pub use draftsafe_store::{DraftStore, FileCache, KeyValueCache, MemoryCache};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{AutoSaveConfig, AutoSaveConfigBuilder};
    pub use crate::coordinator::{AutoSaveCoordinator, AutoSaveEvent, SaveTrigger};
    pub use crate::driver::{spawn_driver, TokioClock};
    pub use crate::persistence::{MemoryPersistence, PersistError, Persistence};
    pub use draftsafe_core::{Clock, ContentValue, ManualClock, SaveState, SaveStatus};
    pub use draftsafe_store::{FileCache, KeyValueCache, MemoryCache};
}
