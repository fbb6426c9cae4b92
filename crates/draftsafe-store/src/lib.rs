//! # draftsafe-store
//!
//! Local durable storage for unsaved drafts.
//!
//! - [`KeyValueCache`]: the string key-value contract (`get`/`set`/`delete`)
//! - [`MemoryCache`]: in-process cache for tests and simulations
//! - [`FileCache`]: one file per key in a directory, surviving restarts
//! - [`DraftStore`]: typed `LocalDraft` access over any cache, keyed by
//!   `"draft_" + documentId`

pub mod cache;
pub mod drafts;
pub mod error;
pub mod file;

pub use cache::{KeyValueCache, MemoryCache};
pub use drafts::DraftStore;
pub use error::{CacheError, Result};
pub use file::FileCache;
