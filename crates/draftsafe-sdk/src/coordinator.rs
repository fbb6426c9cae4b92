//! The auto-save coordinator.
//!
//! Mediates between the editor's in-memory value, the local draft cache and
//! the remote persistence service:
//!
//! ```text
//! update_content ──► content (immediate)
//!        │
//!        ├──► local-write debounce (D1) ──► draft_<id> in the cache
//!        └──► remote-save debounce (D2) ──┐
//!                                         ├──► persist(id, content)
//! periodic interval, if unsaved ──────────┤
//! save() ─────────────────────────────────┘
//! ```
//!
//! All timers are deadlines over the injected [`Clock`]; nothing here sleeps.
//! [`tick`](AutoSaveCoordinator::tick) fires whatever is due, and
//! [`spawn_driver`](crate::driver::spawn_driver) calls it on tokio time.

use crate::config::AutoSaveConfig;
use crate::error::{AutoSaveError, Result};
use crate::persistence::Persistence;
use crate::timer::{Debounce, Interval};
use draftsafe_core::{
    Clock, ContentValue, DocumentId, DraftCheck, LocalDraft, Millis, SaveState, SaveStatus,
};
use draftsafe_store::{DraftStore, KeyValueCache};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch, Notify};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 100;

/// What started a remote save.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SaveTrigger {
    /// An explicit `save()` call.
    Manual,
    /// The remote-save debounce elapsed.
    Debounce,
    /// The background interval found unsaved changes.
    Periodic,
}

/// Events emitted by the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AutoSaveEvent {
    /// The latest content was written to the local cache.
    DraftWritten { timestamp: Millis },
    /// A remote save began.
    SaveStarted { trigger: SaveTrigger },
    /// A remote save completed.
    SaveSucceeded { saved_at: Millis },
    /// A remote save failed or could not be attempted.
    SaveFailed { error: String },
    /// In-memory content was replaced by the cached draft.
    DraftRestored { timestamp: Millis },
    /// The cached draft was deleted on request.
    DraftDiscarded,
}

/// What a call to [`tick`](AutoSaveCoordinator::tick) did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub draft_written: bool,
    pub save: Option<SaveTrigger>,
    pub save_error: Option<String>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        !self.draft_written && self.save.is_none()
    }
}

/// A remote save that has been started but not settled.
struct SaveTicket {
    document_id: DocumentId,
    content: ContentValue,
    revision: u64,
    attempt: u64,
}

struct EditorState {
    content: Option<ContentValue>,
    /// Bumped on every content replacement.
    revision: u64,
    last_saved: Option<ContentValue>,
    status: SaveStatus,
    local_write: Debounce,
    remote_save: Debounce,
    periodic: Interval,
    recovery: Option<LocalDraft>,
    next_attempt: u64,
    settled_attempt: u64,
    disposed: bool,
}

/// Keeps a document's remote copy eventually consistent with local edits.
///
/// Generic over the remote [`Persistence`], the local [`KeyValueCache`] and
/// the [`Clock`], all injected at construction.
pub struct AutoSaveCoordinator<P, C, K>
where
    P: Persistence,
    C: KeyValueCache,
    K: Clock,
{
    document_id: Option<DocumentId>,
    config: AutoSaveConfig,
    persistence: P,
    drafts: DraftStore<C>,
    clock: K,
    state: Mutex<EditorState>,
    status_tx: watch::Sender<SaveStatus>,
    event_tx: broadcast::Sender<AutoSaveEvent>,
    wake: Notify,
}

impl<P, C, K> AutoSaveCoordinator<P, C, K>
where
    P: Persistence,
    C: KeyValueCache,
    K: Clock,
{
    /// Create a coordinator for `document_id`.
    ///
    /// Reads the local cache once: a draft for this document younger than
    /// the freshness window becomes the [`recovery_offer`](Self::recovery_offer).
    /// A blank or unusable id is accepted, but every save then fails locally.
    pub fn new(
        document_id: impl AsRef<str>,
        persistence: P,
        cache: C,
        clock: K,
        config: AutoSaveConfig,
    ) -> Self {
        let document_id = match DocumentId::parse(document_id) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "auto-save coordinator created without a document id");
                None
            }
        };

        let now = clock.now_ms();
        let drafts = DraftStore::new(cache);
        let recovery = document_id
            .as_ref()
            .and_then(|id| match drafts.load(id) {
                Ok(Some(draft)) if draft.is_fresh(now, config.draft_freshness_ms) => {
                    info!(document_id = %id, age_ms = draft.age_ms(now), "found recoverable draft");
                    Some(draft)
                }
                Ok(Some(draft)) => {
                    debug!(document_id = %id, age_ms = draft.age_ms(now), "ignoring stale draft");
                    None
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(document_id = %id, error = %e, "could not read local draft");
                    None
                }
            });

        let state = EditorState {
            content: None,
            revision: 0,
            last_saved: None,
            status: SaveStatus::default(),
            local_write: Debounce::new(),
            remote_save: Debounce::new(),
            periodic: Interval::new(now, config.periodic_sync_ms),
            recovery,
            next_attempt: 0,
            settled_attempt: 0,
            disposed: false,
        };

        let (status_tx, _) = watch::channel(SaveStatus::default());
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            document_id,
            config,
            persistence,
            drafts,
            clock,
            state: Mutex::new(state),
            status_tx,
            event_tx,
            wake: Notify::new(),
        }
    }

    /// Seed the coordinator with the content last loaded from the server.
    ///
    /// The raw value is normalized from any legacy shape and counts as the
    /// last-saved snapshot.
    pub fn with_initial_content(self, raw: serde_json::Value) -> Self {
        let content = ContentValue::normalize(raw);
        {
            let mut state = self.state.lock();
            state.last_saved = Some(content.clone());
            state.content = Some(content);
        }
        self
    }

    pub fn document_id(&self) -> Option<&DocumentId> {
        self.document_id.as_ref()
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.config
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// The local cache backing the drafts.
    pub fn cache(&self) -> &C {
        self.drafts.cache()
    }

    /// Current status snapshot.
    pub fn status(&self) -> SaveStatus {
        self.state.lock().status.clone()
    }

    /// Watch status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status_tx.subscribe()
    }

    /// Subscribe to coordinator events.
    pub fn subscribe(&self) -> broadcast::Receiver<AutoSaveEvent> {
        self.event_tx.subscribe()
    }

    /// Latest in-memory content.
    pub fn content(&self) -> Option<ContentValue> {
        self.state.lock().content.clone()
    }

    /// The fresh draft found at startup, until restored or discarded.
    pub fn recovery_offer(&self) -> Option<LocalDraft> {
        self.state.lock().recovery.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Record new editor content.
    ///
    /// Never blocks on I/O. Restarts both debounces, so only the last of a
    /// burst of edits reaches the cache and the remote service.
    pub fn update_content(&self, content: ContentValue) {
        let now = self.clock.now_ms();
        {
            let mut state = self.state.lock();
            if state.disposed {
                debug!("ignoring edit after dispose");
                return;
            }

            state.status.has_unsaved_changes = state.last_saved.as_ref() != Some(&content);
            if matches!(state.status.state, SaveState::Saved | SaveState::Error) {
                state.status.state = SaveState::Idle;
                state.status.error = None;
            }
            state.content = Some(content);
            state.revision += 1;
            state.local_write.arm(now, self.config.local_debounce_ms);
            state.remote_save.arm(now, self.config.remote_debounce());
            self.publish(&state.status);
        }
        self.wake.notify_one();
    }

    /// Save the latest content now.
    ///
    /// Cancels the pending remote-save debounce and returns once the remote
    /// call settles. The outcome is also reflected in [`status`](Self::status).
    /// With no content yet there is nothing to save and this returns `Ok`.
    pub async fn save(&self) -> Result<()> {
        let ticket = {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(AutoSaveError::Disposed);
            }
            state.remote_save.cancel();
            self.begin_save(&mut state, SaveTrigger::Manual)?
        };
        match ticket {
            Some(ticket) => self.run_save(ticket).await,
            None => Ok(()),
        }
    }

    /// Fire every timer that is due at the clock's current instant.
    ///
    /// The local write happens first, so a draft exists before any remote
    /// attempt. A debounce and a periodic firing in the same tick result in
    /// a single save.
    pub async fn tick(&self) -> TickReport {
        let now = self.clock.now_ms();
        let mut report = TickReport::default();

        let ticket = {
            let mut state = self.state.lock();
            if state.disposed {
                return report;
            }

            if state.local_write.fire(now) {
                report.draft_written = self.write_draft(&state, now);
            }

            let debounce_due = state.remote_save.fire(now);
            let periodic_due = state.periodic.fire(now) && state.status.has_unsaved_changes;
            let trigger = if debounce_due {
                Some(SaveTrigger::Debounce)
            } else if periodic_due {
                Some(SaveTrigger::Periodic)
            } else {
                None
            };

            match trigger {
                Some(trigger) => {
                    debug!(?trigger, "save timer fired");
                    report.save = Some(trigger);
                    match self.begin_save(&mut state, trigger) {
                        Ok(ticket) => ticket,
                        Err(e) => {
                            report.save_error = Some(e.to_string());
                            None
                        }
                    }
                }
                None => None,
            }
        };

        if let Some(ticket) = ticket {
            if let Err(e) = self.run_save(ticket).await {
                report.save_error = Some(e.to_string());
            }
        }
        report
    }

    /// Earliest pending deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<Millis> {
        let state = self.state.lock();
        if state.disposed {
            return None;
        }
        [
            state.local_write.due(),
            state.remote_save.due(),
            state.periodic.due(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Read the cached draft for this document. Does not change any state.
    pub fn check_for_local_draft(&self) -> DraftCheck {
        let Some(id) = self.document_id.as_ref() else {
            return DraftCheck::none();
        };
        match self.drafts.load(id) {
            Ok(Some(draft)) => DraftCheck::from(draft),
            Ok(None) => DraftCheck::none(),
            Err(e) => {
                warn!(document_id = %id, error = %e, "could not read local draft");
                DraftCheck::none()
            }
        }
    }

    /// Replace in-memory content with the cached draft.
    ///
    /// Marks the document as having unsaved changes but does not start a
    /// save; the next edit, manual save or periodic tick will. Returns the
    /// restored content, or `None` if there was no draft.
    pub fn restore_from_local_draft(&self) -> Option<ContentValue> {
        let id = self.document_id.as_ref()?;
        let cached = match self.drafts.load(id) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(document_id = %id, error = %e, "could not read local draft");
                None
            }
        };

        let content = {
            let mut state = self.state.lock();
            if state.disposed {
                return None;
            }
            let draft = cached.or_else(|| state.recovery.clone())?;

            state.recovery = None;
            state.content = Some(draft.content.clone());
            state.revision += 1;
            state.status.has_unsaved_changes = true;
            if matches!(state.status.state, SaveState::Saved | SaveState::Error) {
                state.status.state = SaveState::Idle;
                state.status.error = None;
            }
            self.publish(&state.status);
            self.emit(AutoSaveEvent::DraftRestored {
                timestamp: draft.timestamp,
            });
            info!(document_id = %id, timestamp = draft.timestamp, "restored local draft");
            draft.content
        };
        self.wake.notify_one();
        Some(content)
    }

    /// Delete the cached draft and clear the unsaved flag.
    ///
    /// In-memory content is left untouched. A pending local write is
    /// cancelled so the discarded draft is not written back.
    pub fn discard_local_draft(&self) {
        let mut state = self.state.lock();
        state.recovery = None;
        state.local_write.cancel();
        state.status.has_unsaved_changes = false;

        if let Some(id) = self.document_id.as_ref() {
            match self.drafts.remove(id) {
                Ok(()) => info!(document_id = %id, "discarded local draft"),
                Err(e) => warn!(document_id = %id, error = %e, "could not delete local draft"),
            }
        }
        self.publish(&state.status);
        self.emit(AutoSaveEvent::DraftDiscarded);
    }

    /// Tear down: cancel every timer. Later ticks and edits do nothing.
    ///
    /// A pending local write is flushed first so the last edit survives as
    /// a draft. A save already in flight still settles and updates the status.
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            if state.local_write.is_pending() {
                state.local_write.cancel();
                let now = self.clock.now_ms();
                self.write_draft(&state, now);
            }
            state.disposed = true;
            state.remote_save.cancel();
            state.periodic.stop();
        }
        debug!(document_id = ?self.document_id, "auto-save coordinator disposed");
        self.wake.notify_one();
    }

    pub(crate) fn wake(&self) -> &Notify {
        &self.wake
    }

    fn write_draft(&self, state: &EditorState, now: Millis) -> bool {
        let (Some(id), Some(content)) = (self.document_id.as_ref(), state.content.as_ref()) else {
            return false;
        };
        let draft = LocalDraft::new(id, content.clone(), now);
        match self.drafts.store(&draft) {
            Ok(()) => {
                debug!(document_id = %id, timestamp = now, "local draft written");
                self.emit(AutoSaveEvent::DraftWritten { timestamp: now });
                true
            }
            Err(e) => {
                warn!(document_id = %id, error = %e, "could not write local draft");
                false
            }
        }
    }

    /// Move to `saving` and snapshot what to send.
    ///
    /// Fails immediately, without a remote call, when there is no document id.
    fn begin_save(
        &self,
        state: &mut EditorState,
        trigger: SaveTrigger,
    ) -> Result<Option<SaveTicket>> {
        let Some(id) = self.document_id.as_ref() else {
            let error = AutoSaveError::MissingDocumentId;
            state.status.state = SaveState::Error;
            state.status.error = Some(error.to_string());
            self.publish(&state.status);
            self.emit(AutoSaveEvent::SaveFailed {
                error: error.to_string(),
            });
            warn!(?trigger, "save attempted without a document id");
            return Err(error);
        };
        let Some(content) = state.content.clone() else {
            debug!(?trigger, "nothing to save yet");
            return Ok(None);
        };

        state.next_attempt += 1;
        state.status.state = SaveState::Saving;
        self.publish(&state.status);
        self.emit(AutoSaveEvent::SaveStarted { trigger });

        Ok(Some(SaveTicket {
            document_id: id.clone(),
            content,
            revision: state.revision,
            attempt: state.next_attempt,
        }))
    }

    async fn run_save(&self, ticket: SaveTicket) -> Result<()> {
        let outcome = self
            .persistence
            .persist(&ticket.document_id, &ticket.content)
            .await;
        let now = self.clock.now_ms();

        let mut state = self.state.lock();
        if ticket.attempt < state.settled_attempt {
            debug!(attempt = ticket.attempt, "ignoring superseded save result");
            return outcome.map_err(AutoSaveError::from);
        }
        state.settled_attempt = ticket.attempt;

        let result = match outcome {
            Ok(()) => {
                state.status.state = SaveState::Saved;
                state.status.last_saved = Some(now);
                state.status.error = None;
                state.last_saved = Some(ticket.content);

                if ticket.revision == state.revision {
                    state.status.has_unsaved_changes = false;
                    state.local_write.cancel();
                    if let Err(e) = self.drafts.remove(&ticket.document_id) {
                        warn!(document_id = %ticket.document_id, error = %e, "could not delete local draft");
                    }
                } else {
                    // edited while the save was in flight; the draft still matters
                    state.status.has_unsaved_changes = state.content != state.last_saved;
                }

                info!(document_id = %ticket.document_id, saved_at = now, "document saved");
                self.emit(AutoSaveEvent::SaveSucceeded { saved_at: now });
                Ok(())
            }
            Err(e) => {
                state.status.state = SaveState::Error;
                state.status.error = Some(e.to_string());
                state.status.has_unsaved_changes = true;

                // the failed content must survive even if the debounce never fires
                if state.local_write.is_pending() {
                    state.local_write.cancel();
                    self.write_draft(&state, now);
                }

                warn!(document_id = %ticket.document_id, error = %e, "save failed");
                self.emit(AutoSaveEvent::SaveFailed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        };
        self.publish(&state.status);
        result
    }

    fn publish(&self, status: &SaveStatus) {
        self.status_tx.send_replace(status.clone());
    }

    fn emit(&self, event: AutoSaveEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl<P, C, K> Drop for AutoSaveCoordinator<P, C, K>
where
    P: Persistence,
    C: KeyValueCache,
    K: Clock,
{
    fn drop(&mut self) {
        self.dispose();
    }
}
