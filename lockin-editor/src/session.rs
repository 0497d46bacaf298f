// SPDX-License-Identifier: AGPL-3.0-or-later
//! Editing session for a single note
//!
//! A session loads one file, tracks the in-memory buffer against the last
//! persisted text, and keeps a bounded undo/redo history. Edits schedule two
//! debounced effects: a history snapshot (1s by default) and an autosave
//! (1.5s by default). Undo and redo persist immediately.
//!
//! Every asynchronous result is tagged with the session generation it was
//! started under. Reloading or closing bumps the generation, so late results
//! from the previous incarnation are dropped instead of applied.

use lockin_core::{
    config::EditorConfig,
    markup::{self, MarkupDocument},
    LockInError, LockInResult, NotePath, NoteStore,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::history::EditHistory;
use crate::scheduler::{action, Scheduler, TimerKey};
use crate::stats::TextStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Clean,
    Dirty,
    Saving,
    Error,
    Closed,
}

/// Which operation produced the current error banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    Load,
    Save,
    Share,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub origin: ErrorOrigin,
    pub message: String,
    /// Whether trying the same operation again may succeed
    pub retryable: bool,
}

/// Plain copy of the session state for view code
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub path: NotePath,
    pub phase: SessionPhase,
    pub content: String,
    pub saved_content: String,
    pub is_dirty: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub history_len: usize,
    pub history_index: usize,
    pub error: Option<SessionError>,
    pub stats: TextStats,
}

enum HistoryStep {
    Undo,
    Redo,
}

struct SessionState {
    generation: u64,
    loading: bool,
    loaded: bool,
    closed: bool,
    saves_in_flight: usize,
    error: Option<SessionError>,
    content: String,
    saved_content: String,
    history: EditHistory,
    markup: Option<MarkupDocument>,
    next_save_seq: u64,
    applied_save_seq: u64,
    discard_epoch: u64,
}

impl SessionState {
    fn phase(&self) -> SessionPhase {
        let failed = matches!(
            self.error,
            Some(SessionError { origin: ErrorOrigin::Load | ErrorOrigin::Save, .. })
        );
        if self.closed {
            SessionPhase::Closed
        } else if self.loading {
            SessionPhase::Loading
        } else if failed {
            SessionPhase::Error
        } else if self.saves_in_flight > 0 {
            SessionPhase::Saving
        } else if self.content != self.saved_content {
            SessionPhase::Dirty
        } else {
            SessionPhase::Clean
        }
    }

    fn ensure_editable(&self, path: &NotePath) -> LockInResult<()> {
        if self.closed {
            Err(LockInError::SessionClosed)
        } else if !self.loaded {
            Err(LockInError::NotLoaded(path.to_string()))
        } else {
            Ok(())
        }
    }
}

struct SessionInner {
    path: NotePath,
    store: Arc<dyn NoteStore>,
    scheduler: Arc<dyn Scheduler>,
    config: EditorConfig,
    state: Mutex<SessionState>,
    /// Serialises writes so an older save can never land after a newer one.
    save_lock: AsyncMutex<()>,
}

impl SessionInner {
    fn cancel_timers(&self) {
        self.scheduler.cancel(TimerKey::HistoryCapture);
        self.scheduler.cancel(TimerKey::Autosave);
    }

    fn schedule_debounced(self: &Arc<Self>, generation: u64) {
        let weak = Arc::downgrade(self);
        self.scheduler.schedule(
            TimerKey::HistoryCapture,
            self.config.history_debounce(),
            action(move || async move {
                if let Some(inner) = weak.upgrade() {
                    inner.capture_history(generation);
                }
            }),
        );

        let weak = Arc::downgrade(self);
        self.scheduler.schedule(
            TimerKey::Autosave,
            self.config.autosave_debounce(),
            action(move || async move {
                if let Some(inner) = weak.upgrade() {
                    // Failures are recorded on the session as the error banner.
                    let _ = inner.persist(generation).await;
                }
            }),
        );
    }

    fn capture_history(&self, generation: u64) {
        let mut st = self.state.lock();
        if st.generation != generation || st.closed {
            debug!(path = %self.path, "Skipping history capture for stale session");
            return;
        }
        let content = st.content.clone();
        st.history.commit(content);
        debug!(
            path = %self.path,
            len = st.history.len(),
            index = st.history.index(),
            "History snapshot captured"
        );
    }

    /// Writes the current buffer and, unless the session moved on meanwhile,
    /// records it as the saved text.
    ///
    /// A discard that lands while the write is running reverts the buffer
    /// under it. The write is then repeated with the restored text so the
    /// store never keeps edits the user threw away.
    async fn persist(&self, generation: u64) -> LockInResult<()> {
        let _serial = self.save_lock.lock().await;

        let (mut text, mut seq, mut epoch) = {
            let mut st = self.state.lock();
            if st.generation != generation || st.closed {
                debug!(path = %self.path, "Skipping save for stale session");
                return Ok(());
            }
            st.saves_in_flight += 1;
            st.next_save_seq += 1;
            (st.content.clone(), st.next_save_seq, st.discard_epoch)
        };

        loop {
            let result = self.store.write_file(&self.path, &text).await;

            let rewrite = {
                let mut st = self.state.lock();
                if st.generation != generation {
                    st.saves_in_flight -= 1;
                    debug!(path = %self.path, "Discarding result of stale save");
                    return result;
                }
                if st.discard_epoch != epoch {
                    if let Err(e) = result {
                        st.saves_in_flight -= 1;
                        debug!(path = %self.path, "Save of discarded text failed: {}", e);
                        return Err(e);
                    }
                    st.next_save_seq += 1;
                    (st.content.clone(), st.next_save_seq, st.discard_epoch)
                } else {
                    st.saves_in_flight -= 1;
                    return self.record_save(&mut st, text, seq, result);
                }
            };

            debug!(path = %self.path, "Buffer discarded during save, writing it again");
            (text, seq, epoch) = rewrite;
        }
    }

    fn record_save(
        &self,
        st: &mut SessionState,
        text: String,
        seq: u64,
        result: LockInResult<()>,
    ) -> LockInResult<()> {
        match result {
            Ok(()) => {
                if seq > st.applied_save_seq {
                    st.applied_save_seq = seq;
                    st.saved_content = text;
                }
                if matches!(&st.error, Some(e) if e.origin == ErrorOrigin::Save) {
                    st.error = None;
                }
                debug!(path = %self.path, dirty = st.content != st.saved_content, "Saved");
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path, "Failed to save changes: {}", e);
                st.error = Some(SessionError {
                    origin: ErrorOrigin::Save,
                    message: format!("Failed to save changes: {}", e),
                    retryable: e.is_retryable(),
                });
                Err(e)
            }
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

/// Handle to an open note. Clones share the same session.
#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<SessionInner>,
}

impl EditorSession {
    /// Creates a session in the `Loading` phase without touching the store.
    pub fn new(
        path: NotePath,
        store: Arc<dyn NoteStore>,
        scheduler: Arc<dyn Scheduler>,
        config: EditorConfig,
    ) -> Self {
        let history = EditHistory::new(config.history_limit);
        let state = SessionState {
            generation: 0,
            loading: true,
            loaded: false,
            closed: false,
            saves_in_flight: 0,
            error: None,
            content: String::new(),
            saved_content: String::new(),
            history,
            markup: None,
            next_save_seq: 0,
            applied_save_seq: 0,
            discard_epoch: 0,
        };
        Self {
            inner: Arc::new(SessionInner {
                path,
                store,
                scheduler,
                config,
                state: Mutex::new(state),
                save_lock: AsyncMutex::new(()),
            }),
        }
    }

    /// Creates and loads a session. A failed load leaves the session in the
    /// `Error` phase; call [`load`](Self::load) to retry.
    pub async fn open(
        path: NotePath,
        store: Arc<dyn NoteStore>,
        scheduler: Arc<dyn Scheduler>,
        config: EditorConfig,
    ) -> Self {
        let session = Self::new(path, store, scheduler, config);
        if let Err(e) = session.load().await {
            warn!(path = %session.path(), "Opened note in error state: {}", e);
        }
        session
    }

    /// (Re)reads the file, replacing buffer, saved text and history.
    pub async fn load(&self) -> LockInResult<()> {
        let generation = {
            let mut st = self.inner.state.lock();
            if st.closed {
                return Err(LockInError::SessionClosed);
            }
            st.generation += 1;
            st.loading = true;
            st.error = None;
            st.generation
        };
        self.inner.cancel_timers();
        debug!(path = %self.inner.path, "Loading note");

        let result = self.inner.store.read_file(&self.inner.path).await;
        let markup = match &result {
            Ok(_) => markup::load_sidecar(self.inner.store.as_ref(), &self.inner.path).await,
            Err(_) => None,
        };

        let mut st = self.inner.state.lock();
        if st.closed {
            return Err(LockInError::SessionClosed);
        }
        if st.generation != generation {
            debug!(path = %self.inner.path, "Discarding stale load");
            return Ok(());
        }
        st.loading = false;

        match result {
            Ok(text) => {
                st.content = text.clone();
                st.saved_content = text.clone();
                st.history.reset(text);
                st.markup = markup;
                st.loaded = true;
                info!(path = %self.inner.path, "Opened note");
                Ok(())
            }
            Err(e) => {
                error!(path = %self.inner.path, "Failed to load file: {}", e);
                st.content.clear();
                st.saved_content.clear();
                st.history.clear();
                st.markup = None;
                st.loaded = false;
                st.error = Some(SessionError {
                    origin: ErrorOrigin::Load,
                    message: format!("Failed to load file: {}", e),
                    retryable: e.is_retryable(),
                });
                Err(e)
            }
        }
    }

    /// Replaces the buffer and restarts both debounce timers.
    pub fn set_content(&self, text: impl Into<String>) -> LockInResult<()> {
        let generation = {
            let mut st = self.inner.state.lock();
            st.ensure_editable(&self.inner.path)?;
            st.content = text.into();
            st.generation
        };
        self.inner.schedule_debounced(generation);
        Ok(())
    }

    /// Returns `false` when there is nothing to undo.
    pub async fn undo(&self) -> LockInResult<bool> {
        self.step_history(HistoryStep::Undo).await
    }

    /// Returns `false` when there is nothing to redo.
    pub async fn redo(&self) -> LockInResult<bool> {
        self.step_history(HistoryStep::Redo).await
    }

    async fn step_history(&self, step: HistoryStep) -> LockInResult<bool> {
        let generation = {
            let mut st = self.inner.state.lock();
            st.ensure_editable(&self.inner.path)?;
            let restored = match step {
                HistoryStep::Undo => st.history.undo().map(str::to_owned),
                HistoryStep::Redo => st.history.redo().map(str::to_owned),
            };
            let Some(restored) = restored else {
                return Ok(false);
            };
            st.content = restored;
            st.generation
        };
        self.inner.cancel_timers();
        self.inner.persist(generation).await?;
        Ok(true)
    }

    /// Drops unsaved edits and restarts history from the saved text.
    ///
    /// A save already writing the dropped text is followed by a rewrite of
    /// the restored text.
    pub fn discard(&self) -> LockInResult<()> {
        {
            let mut st = self.inner.state.lock();
            st.ensure_editable(&self.inner.path)?;
            let saved = st.saved_content.clone();
            st.discard_epoch += 1;
            st.content = saved.clone();
            st.history.reset(saved);
            if matches!(&st.error, Some(e) if e.origin == ErrorOrigin::Save) {
                st.error = None;
            }
        }
        self.inner.cancel_timers();
        debug!(path = %self.inner.path, "Discarded unsaved changes");
        Ok(())
    }

    /// Saves right away, cancelling any pending autosave.
    pub async fn save_now(&self) -> LockInResult<()> {
        let generation = {
            let st = self.inner.state.lock();
            st.ensure_editable(&self.inner.path)?;
            st.generation
        };
        self.inner.scheduler.cancel(TimerKey::Autosave);
        self.inner.persist(generation).await
    }

    /// Shares the file, saving unsaved edits first. If that save fails the
    /// share is abandoned so stale content is never handed out.
    pub async fn share(&self) -> LockInResult<()> {
        let (generation, dirty) = {
            let st = self.inner.state.lock();
            st.ensure_editable(&self.inner.path)?;
            (st.generation, st.content != st.saved_content)
        };

        if dirty {
            self.inner.scheduler.cancel(TimerKey::Autosave);
            if let Err(e) = self.inner.persist(generation).await {
                warn!(path = %self.inner.path, "Share aborted, save failed: {}", e);
                return Err(e);
            }
        }

        if let Err(e) = self.inner.store.share_file(&self.inner.path).await {
            error!(path = %self.inner.path, "Failed to share file: {}", e);
            let mut st = self.inner.state.lock();
            if st.generation == generation {
                st.error = Some(SessionError {
                    origin: ErrorOrigin::Share,
                    message: format!("Failed to share file: {}", e),
                    retryable: e.is_retryable(),
                });
            }
            return Err(e);
        }
        Ok(())
    }

    /// Writes the markup sidecar for this note.
    pub async fn save_markup(&self, mut doc: MarkupDocument) -> LockInResult<()> {
        {
            let st = self.inner.state.lock();
            st.ensure_editable(&self.inner.path)?;
        }
        doc.touch();
        markup::save_sidecar(self.inner.store.as_ref(), &self.inner.path, &doc).await?;
        self.inner.state.lock().markup = Some(doc);
        Ok(())
    }

    pub fn dismiss_error(&self) {
        self.inner.state.lock().error = None;
    }

    /// Cancels timers, flushes unsaved edits, and retires the session.
    /// Results still in flight afterwards are ignored.
    pub async fn close(&self) -> LockInResult<()> {
        let (generation, dirty) = {
            let st = self.inner.state.lock();
            if st.closed {
                return Ok(());
            }
            (st.generation, st.loaded && st.content != st.saved_content)
        };
        self.inner.cancel_timers();

        let result = if dirty {
            self.inner.persist(generation).await
        } else {
            Ok(())
        };

        {
            let mut st = self.inner.state.lock();
            st.closed = true;
            st.generation += 1;
        }
        info!(path = %self.inner.path, "Closed note");
        result
    }

    pub fn path(&self) -> &NotePath {
        &self.inner.path
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state.lock().phase()
    }

    pub fn content(&self) -> String {
        self.inner.state.lock().content.clone()
    }

    pub fn saved_content(&self) -> String {
        self.inner.state.lock().saved_content.clone()
    }

    pub fn is_dirty(&self) -> bool {
        let st = self.inner.state.lock();
        st.content != st.saved_content
    }

    pub fn can_undo(&self) -> bool {
        self.inner.state.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.state.lock().history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.inner.state.lock().history.len()
    }

    pub fn history_index(&self) -> usize {
        self.inner.state.lock().history.index()
    }

    pub fn history_contents(&self) -> Vec<String> {
        self.inner.state.lock().history.contents()
    }

    pub fn error(&self) -> Option<SessionError> {
        self.inner.state.lock().error.clone()
    }

    pub fn stats(&self) -> TextStats {
        TextStats::of(&self.inner.state.lock().content)
    }

    pub fn markup(&self) -> Option<MarkupDocument> {
        self.inner.state.lock().markup.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.inner.state.lock();
        SessionSnapshot {
            path: self.inner.path.clone(),
            phase: st.phase(),
            content: st.content.clone(),
            saved_content: st.saved_content.clone(),
            is_dirty: st.content != st.saved_content,
            can_undo: st.history.can_undo(),
            can_redo: st.history.can_redo(),
            history_len: st.history.len(),
            history_index: st.history.index(),
            error: st.error.clone(),
            stats: TextStats::of(&st.content),
        }
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("path", &self.inner.path)
            .field("phase", &self.phase())
            .finish()
    }
}
