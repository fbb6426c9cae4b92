//! # draftsafe-core
//!
//! Shared vocabulary for the Draftsafe auto-save coordinator.
//!
//! This crate provides:
//! - `ContentValue`, the opaque editor payload, and normalization of the
//!   legacy stored shapes into the canonical node array
//! - `DocumentId` validation
//! - `LocalDraft` records and the recovery check result
//! - `SaveStatus`, the observable save state
//! - An injectable `Clock` so timers can be driven deterministically
//!
//! ## Example
//!
//! ```rust
//! use draftsafe_core::{ContentValue, DocumentId, LegacyContent, LocalDraft};
//! use serde_json::json;
//!
//! let id = DocumentId::parse("doc-1").unwrap();
//! let content = LegacyContent::classify(json!({
//!     "type": "rich_text",
//!     "blocks": [{ "type": "heading", "level": 2, "content": "Notes" }]
//! }))
//! .into_content();
//!
//! let draft = LocalDraft::new(&id, content, 1_000);
//! assert_eq!(LocalDraft::cache_key(&id), "draft_doc-1");
//! assert_eq!(draft.content.paragraph_texts(), vec!["Notes".to_string()]);
//! ```

pub mod clock;
pub mod content;
pub mod document;
pub mod draft;
pub mod error;
pub mod status;

pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use content::{ContentValue, LegacyContent, RichTextBlock, RichTextItem};
pub use document::{DocumentId, MAX_DOCUMENT_ID_LEN};
pub use draft::{DraftCheck, LocalDraft, DRAFT_KEY_PREFIX};
pub use error::{ContentError, Result};
pub use status::{SaveState, SaveStatus};
