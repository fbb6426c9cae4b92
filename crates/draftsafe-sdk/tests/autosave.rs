//! Integration tests for the auto-save coordinator.
//!
//! Tests cover:
//! - Debounce coalescing of local draft writes
//! - Draft lifecycle across successful and failed saves
//! - Startup recovery: fresh, stale and foreign drafts
//! - Periodic sync under continuous typing
//! - Missing document identity
//! - Overlapping saves and edits during an in-flight save

use draftsafe_sdk::prelude::*;
use draftsafe_sdk::{
    AutoSaveError, DocumentId, KeyValueCache, LocalDraft, TickReport, MAX_DOCUMENT_ID_LEN,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const START: u64 = 1_700_000_000_000;

type Coordinator = AutoSaveCoordinator<Arc<MemoryPersistence>, Arc<MemoryCache>, ManualClock>;

struct Harness {
    coordinator: Coordinator,
    persistence: Arc<MemoryPersistence>,
    cache: Arc<MemoryCache>,
    clock: ManualClock,
}

impl Harness {
    fn new(document_id: &str) -> Self {
        Self::with_cache(document_id, Arc::new(MemoryCache::new()), ManualClock::new(START))
    }

    fn with_cache(document_id: &str, cache: Arc<MemoryCache>, clock: ManualClock) -> Self {
        let persistence = Arc::new(MemoryPersistence::new());
        let coordinator = AutoSaveCoordinator::new(
            document_id,
            persistence.clone(),
            cache.clone(),
            clock.clone(),
            AutoSaveConfig::default(),
        );
        Self {
            coordinator,
            persistence,
            cache,
            clock,
        }
    }

    /// Let `ms` of virtual time pass, ticking at every deadline on the way.
    async fn wait(&self, ms: u64) -> Vec<TickReport> {
        let target = self.clock.now_ms() + ms;
        let mut reports = Vec::new();
        while let Some(due) = self.coordinator.next_deadline() {
            if due > target {
                break;
            }
            self.clock.set(due);
            reports.push(self.coordinator.tick().await);
        }
        self.clock.set(target);
        reports
    }

    fn cached_draft(&self, id: &str) -> Option<LocalDraft> {
        self.cache
            .get(&format!("draft_{}", id))
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

fn text(s: &str) -> ContentValue {
    ContentValue::from(json!({ "text": s }))
}

#[tokio::test]
async fn test_debounce_coalesces_local_writes() {
    let h = Harness::new("doc1");

    for s in ["a", "ab", "abc", "abcd"] {
        h.coordinator.update_content(text(s));
        h.wait(400).await;
    }
    assert_eq!(h.cache.write_count(), 0);

    h.wait(650).await;
    assert_eq!(h.cache.write_count(), 1);
    assert_eq!(h.cached_draft("doc1").unwrap().content, text("abcd"));
}

#[tokio::test]
async fn test_draft_scenario_a_then_ab() {
    let h = Harness::new("doc1");

    h.coordinator.update_content(text("a"));
    h.wait(1_050).await;
    assert_eq!(h.cached_draft("doc1").unwrap().content, text("a"));

    h.coordinator.update_content(text("ab"));
    h.wait(1_050).await;

    assert_eq!(h.cache.len(), 1);
    assert_eq!(h.cached_draft("doc1").unwrap().content, text("ab"));
}

#[tokio::test]
async fn test_successful_save_clears_draft() {
    let h = Harness::new("doc1");

    h.coordinator.update_content(text("a"));
    h.wait(1_000).await;
    assert!(h.cached_draft("doc1").is_some());

    assert_eq!(h.coordinator.save().await, Ok(()));

    let status = h.coordinator.status();
    assert_eq!(status.state, SaveState::Saved);
    assert!(!status.has_unsaved_changes);
    assert_eq!(status.last_saved, Some(h.clock.now_ms()));
    assert!(h.cached_draft("doc1").is_none());
    assert_eq!(h.persistence.latest(&DocumentId::parse("doc1").unwrap()), Some(text("a")));
}

#[tokio::test]
async fn test_manual_save_before_local_debounce_leaves_no_draft() {
    let h = Harness::new("doc1");

    h.coordinator.update_content(text("a"));
    h.coordinator.save().await.unwrap();
    h.wait(5_000).await;

    assert_eq!(h.cache.write_count(), 0);
    assert!(h.cached_draft("doc1").is_none());
    assert_eq!(h.persistence.call_count(), 1);
}

#[tokio::test]
async fn test_failed_save_keeps_draft() {
    let h = Harness::new("doc1");
    h.persistence
        .fail_next(PersistError::Unavailable("network down".into()));

    h.coordinator.update_content(text("a"));
    h.wait(1_000).await;

    let result = h.coordinator.save().await;
    assert_eq!(
        result,
        Err(AutoSaveError::Persist(PersistError::Unavailable(
            "network down".into()
        )))
    );

    let status = h.coordinator.status();
    assert_eq!(status.state, SaveState::Error);
    assert_eq!(status.error.as_deref(), Some("network down"));
    assert!(status.has_unsaved_changes);
    assert_eq!(h.cached_draft("doc1").unwrap().content, text("a"));
}

#[tokio::test]
async fn test_failed_save_retried_by_periodic_sync() {
    let h = Harness::new("doc1");
    h.persistence
        .fail_always(PersistError::Unavailable("offline".into()));

    h.coordinator.update_content(text("a"));
    h.wait(2_000).await;
    assert_eq!(h.persistence.call_count(), 1);
    assert!(h.coordinator.status().is_error());

    h.persistence.recover();
    let reports = h.wait(30_000).await;

    assert!(reports
        .iter()
        .any(|r| r.save == Some(SaveTrigger::Periodic) && r.save_error.is_none()));
    assert_eq!(h.persistence.call_count(), 2);
    assert_eq!(h.coordinator.status().state, SaveState::Saved);
    assert!(h.cached_draft("doc1").is_none());
}

#[tokio::test]
async fn test_validation_errors_are_joined() {
    let h = Harness::new("doc1");
    h.persistence.fail_next(PersistError::Validation(vec![
        draftsafe_sdk::ValidationIssue::new("title", "Title is required"),
        draftsafe_sdk::ValidationIssue::new("id", "Invalid cuid"),
    ]));

    h.coordinator.update_content(text("a"));
    let _ = h.coordinator.save().await;

    assert_eq!(
        h.coordinator.status().error.as_deref(),
        Some("Title is required, Invalid cuid")
    );
}

#[tokio::test]
async fn test_fresh_document_has_no_draft() {
    let h = Harness::new("never-edited");

    let check = h.coordinator.check_for_local_draft();
    assert!(!check.has_local_draft);
    assert_eq!(check.draft, None);
    assert_eq!(check.timestamp, None);
    assert!(h.coordinator.recovery_offer().is_none());
}

#[tokio::test]
async fn test_startup_recovery_then_discard() {
    let cache = Arc::new(MemoryCache::new());
    let clock = ManualClock::new(START);
    let draft = json!({ "content": { "text": "draft" }, "timestamp": START, "documentId": "doc1" });
    cache.set("draft_doc1", &draft.to_string()).unwrap();

    let h = Harness::with_cache("doc1", cache, clock);

    let check = h.coordinator.check_for_local_draft();
    assert!(check.has_local_draft);
    assert_eq!(check.draft, Some(text("draft")));
    assert_eq!(check.timestamp, Some(START));
    assert!(h.coordinator.recovery_offer().is_some());

    h.coordinator.discard_local_draft();

    assert!(!h.cache.contains("draft_doc1"));
    assert!(h.coordinator.recovery_offer().is_none());
    assert!(!h.coordinator.status().has_unsaved_changes);
}

#[tokio::test]
async fn test_restore_marks_unsaved_without_saving() {
    let cache = Arc::new(MemoryCache::new());
    let clock = ManualClock::new(START);
    let draft = json!({ "content": { "text": "draft" }, "timestamp": START - 60_000, "documentId": "doc1" });
    cache.set("draft_doc1", &draft.to_string()).unwrap();

    let h = Harness::with_cache("doc1", cache, clock);
    let mut events = h.coordinator.subscribe();

    let restored = h.coordinator.restore_from_local_draft();
    assert_eq!(restored, Some(text("draft")));
    assert_eq!(h.coordinator.content(), Some(text("draft")));
    assert!(h.coordinator.status().has_unsaved_changes);
    assert_eq!(h.persistence.call_count(), 0);
    assert_eq!(
        events.recv().await.unwrap(),
        AutoSaveEvent::DraftRestored {
            timestamp: START - 60_000
        }
    );

    // the periodic sync picks the restored content up
    h.wait(30_000).await;
    assert_eq!(h.persistence.call_count(), 1);
    assert!(!h.cache.contains("draft_doc1"));
}

#[tokio::test]
async fn test_stale_draft_not_offered() {
    let cache = Arc::new(MemoryCache::new());
    let clock = ManualClock::new(START);
    let two_hours = 2 * 60 * 60 * 1_000;
    let draft = json!({ "content": { "text": "old" }, "timestamp": START - two_hours, "documentId": "doc1" });
    cache.set("draft_doc1", &draft.to_string()).unwrap();

    let h = Harness::with_cache("doc1", cache, clock);

    assert!(h.coordinator.recovery_offer().is_none());
    // still visible to an explicit check, and left in place
    assert!(h.coordinator.check_for_local_draft().has_local_draft);
    assert!(h.cache.contains("draft_doc1"));
}

#[tokio::test]
async fn test_foreign_draft_ignored() {
    let cache = Arc::new(MemoryCache::new());
    let draft = json!({ "content": { "text": "x" }, "timestamp": START, "documentId": "doc2" });
    cache.set("draft_doc1", &draft.to_string()).unwrap();

    let h = Harness::with_cache("doc1", cache, ManualClock::new(START));

    assert!(!h.coordinator.check_for_local_draft().has_local_draft);
    assert!(h.coordinator.recovery_offer().is_none());
}

#[tokio::test]
async fn test_save_twice_is_idempotent() {
    let h = Harness::new("doc1");
    h.coordinator.update_content(text("same"));

    h.coordinator.save().await.unwrap();
    h.coordinator.save().await.unwrap();

    let calls = h.persistence.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
    assert_eq!(h.coordinator.status().state, SaveState::Saved);
    assert!(!h.coordinator.status().has_unsaved_changes);
}

#[tokio::test]
async fn test_continuous_typing_still_synced_periodically() {
    let h = Harness::new("doc1");

    // an edit every 500ms never lets the 2s remote debounce elapse
    let mut saves = Vec::new();
    for i in 0..70 {
        h.coordinator.update_content(text(&format!("v{}", i)));
        for report in h.wait(500).await {
            if let Some(trigger) = report.save {
                saves.push(trigger);
            }
        }
    }

    assert!(!saves.is_empty());
    assert!(saves.iter().all(|t| *t == SaveTrigger::Periodic));
}

#[tokio::test]
async fn test_periodic_sync_skips_clean_document() {
    let h = Harness::new("doc1");
    h.coordinator.update_content(text("a"));
    h.wait(2_000).await;
    assert_eq!(h.persistence.call_count(), 1);

    h.wait(120_000).await;
    assert_eq!(h.persistence.call_count(), 1);
}

#[tokio::test]
async fn test_missing_document_id_fails_locally() {
    let h = Harness::new("   ");
    assert!(h.coordinator.document_id().is_none());

    h.coordinator.update_content(text("a"));
    let result = h.coordinator.save().await;

    assert_eq!(result, Err(AutoSaveError::MissingDocumentId));
    let status = h.coordinator.status();
    assert_eq!(status.state, SaveState::Error);
    assert_eq!(
        status.error.as_deref(),
        Some("Cannot save: Missing document ID")
    );
    assert_eq!(h.persistence.call_count(), 0);

    // the debounce path fails the same way, and nothing reaches the cache
    let reports = h.wait(3_000).await;
    assert!(reports.iter().any(|r| r.save_error.is_some()));
    assert_eq!(h.persistence.call_count(), 0);
    assert!(h.cache.is_empty());
    assert!(!h.coordinator.check_for_local_draft().has_local_draft);
}

#[tokio::test]
async fn test_overlong_document_id_counts_as_missing() {
    let h = Harness::new(&"ü".repeat(MAX_DOCUMENT_ID_LEN));
    assert!(h.coordinator.document_id().is_none());

    h.coordinator.update_content(text("a"));
    assert_eq!(
        h.coordinator.save().await,
        Err(AutoSaveError::MissingDocumentId)
    );
    h.wait(3_000).await;
    assert!(h.cache.is_empty());
    assert_eq!(h.persistence.call_count(), 0);
}

#[tokio::test]
async fn test_dispose_stops_all_writes() {
    let h = Harness::new("doc1");
    h.coordinator.update_content(text("a"));
    h.coordinator.dispose();

    // the pending local write is flushed once, then nothing else happens
    assert_eq!(h.cache.write_count(), 1);
    h.coordinator.update_content(text("ab"));
    h.wait(60_000).await;
    assert_eq!(h.cache.write_count(), 1);
    assert_eq!(h.cached_draft("doc1").unwrap().content, text("a"));
    assert_eq!(h.persistence.call_count(), 0);
    assert_eq!(h.coordinator.save().await, Err(AutoSaveError::Disposed));
}

#[tokio::test]
async fn test_failed_save_before_debounce_writes_draft() {
    let h = Harness::new("doc1");
    h.persistence
        .fail_next(PersistError::Unavailable("network down".into()));

    h.coordinator.update_content(text("a"));
    assert!(h.coordinator.save().await.is_err());

    assert_eq!(h.coordinator.status().state, SaveState::Error);
    assert_eq!(h.cached_draft("doc1").unwrap().content, text("a"));

    // the debounce was consumed by the failure, so no second write follows
    h.wait(1_500).await;
    assert_eq!(h.cache.write_count(), 1);

    h.coordinator.dispose();
    assert_eq!(h.cached_draft("doc1").unwrap().content, text("a"));
}

#[tokio::test]
async fn test_dispose_keeps_unsaved_edit_as_draft() {
    let h = Harness::new("doc1");
    h.coordinator.update_content(text("typed just before closing"));
    h.coordinator.dispose();

    let draft = h.cached_draft("doc1").unwrap();
    assert_eq!(draft.content, text("typed just before closing"));
    assert_eq!(draft.timestamp, START);

    // the next session offers it back
    let next = Harness::with_cache("doc1", h.cache.clone(), h.clock.clone());
    assert_eq!(
        next.coordinator.recovery_offer().map(|d| d.content),
        Some(text("typed just before closing"))
    );
}

#[tokio::test]
async fn test_dispose_after_save_writes_nothing() {
    let h = Harness::new("doc1");
    h.coordinator.update_content(text("a"));
    h.coordinator.save().await.unwrap();
    h.coordinator.dispose();

    assert_eq!(h.cache.write_count(), 0);
    assert!(h.cached_draft("doc1").is_none());
}

#[tokio::test]
async fn test_edit_during_inflight_save_keeps_unsaved() {
    let persistence = Arc::new(MemoryPersistence::with_latency(Duration::from_millis(50)));
    let cache = Arc::new(MemoryCache::new());
    let clock = ManualClock::new(START);
    let coordinator = Arc::new(AutoSaveCoordinator::new(
        "doc1",
        persistence.clone(),
        cache.clone(),
        clock.clone(),
        AutoSaveConfig::default(),
    ));

    coordinator.update_content(text("a"));
    let saving = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.save().await })
    };
    tokio::task::yield_now().await;
    assert!(coordinator.status().is_saving());

    coordinator.update_content(text("ab"));
    saving.await.unwrap().unwrap();

    let status = coordinator.status();
    assert_eq!(status.state, SaveState::Saved);
    assert!(status.has_unsaved_changes);
    assert_eq!(
        persistence.latest(&DocumentId::parse("doc1").unwrap()),
        Some(text("a"))
    );

    coordinator.save().await.unwrap();
    assert!(!coordinator.status().has_unsaved_changes);
}

#[tokio::test]
async fn test_status_is_observable() {
    let h = Harness::new("doc1");
    let mut rx = h.coordinator.subscribe_status();

    h.coordinator.update_content(text("a"));
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().has_unsaved_changes);

    h.coordinator.save().await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().state, SaveState::Saved);
}
