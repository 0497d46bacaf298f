// SPDX-License-Identifier: AGPL-3.0-or-later
//! Folder browsing over a [`NoteStore`]
//!
//! The navigator caches the last listing of the current folder, holds
//! unnamed "pending" entries while the user types a name, and exposes a
//! status line. Listings are not queued against each other: a listing that
//! resolves after the user has moved on is dropped.

use chrono::Utc;
use lockin_core::{
    config::NavigatorConfig, EntryKind, FileSystemEntry, LockInError, LockInResult, NotePath,
    NoteStore,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::scheduler::{action, Scheduler, TimerKey};

pub type PendingId = Uuid;

/// A file or folder that exists only in the UI until it is named
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub id: PendingId,
    pub kind: EntryKind,
    pub parent_path: NotePath,
    pub proposed_name: String,
}

/// Result of [`DirectoryNavigator::select_entry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The navigator moved into this folder
    Directory(NotePath),
    /// The caller should open this file
    File(NotePath),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Info, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Error, text: text.into() }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorSnapshot {
    pub current_path: NotePath,
    pub entries: Vec<FileSystemEntry>,
    pub pending: Vec<PendingEntry>,
    pub selected: Option<NotePath>,
    pub status: Option<StatusMessage>,
    pub loading: bool,
}

#[derive(Default)]
struct NavigatorState {
    current_path: NotePath,
    entries: Vec<FileSystemEntry>,
    pending: Vec<PendingEntry>,
    selected: Option<NotePath>,
    status: Option<StatusMessage>,
    loading: bool,
    list_generation: u64,
    status_generation: u64,
}

struct NavigatorInner {
    store: Arc<dyn NoteStore>,
    scheduler: Arc<dyn Scheduler>,
    config: NavigatorConfig,
    state: Mutex<NavigatorState>,
}

impl NavigatorInner {
    fn show_status(self: &Arc<Self>, message: StatusMessage) {
        let transient = !message.is_error();
        let generation = {
            let mut st = self.state.lock();
            st.status_generation += 1;
            st.status = Some(message);
            st.status_generation
        };

        if !transient {
            self.scheduler.cancel(TimerKey::StatusClear);
            return;
        }

        let weak = Arc::downgrade(self);
        self.scheduler.schedule(
            TimerKey::StatusClear,
            self.config.status_clear(),
            action(move || async move {
                if let Some(inner) = weak.upgrade() {
                    let mut st = inner.state.lock();
                    if st.status_generation == generation {
                        st.status = None;
                    }
                }
            }),
        );
    }

    fn fail(self: &Arc<Self>, context: &str, err: LockInError) -> LockInError {
        warn!("{}: {}", context, err);
        self.show_status(StatusMessage::error(format!("{}: {}", context, err)));
        err
    }

    fn note_name(&self, name: &str) -> String {
        let suffix = format!(".{}", self.config.note_extension);
        if name.to_lowercase().ends_with(&suffix.to_lowercase()) {
            name.to_string()
        } else {
            format!("{}{}", name, suffix)
        }
    }

    async fn create(&self, kind: EntryKind, path: &NotePath) -> LockInResult<()> {
        if self.store.stat(path).await?.is_some() {
            return Err(LockInError::Conflict(format!("{} already exists", path)));
        }
        match kind {
            EntryKind::Directory => self.store.create_directory(path).await,
            EntryKind::File => self.store.write_file(path, &self.config.note_template).await,
        }
    }
}

impl Drop for NavigatorInner {
    fn drop(&mut self) {
        self.scheduler.cancel(TimerKey::StatusClear);
    }
}

fn validate_name(name: &str) -> LockInResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LockInError::Validation("name cannot be empty".into()));
    }
    if name.contains('/') || name == "." || name == ".." {
        return Err(LockInError::Validation(format!("invalid name '{}'", name)));
    }
    Ok(name)
}

/// Moves `path` from under `from` to under `to`, if it lies there.
fn rebase(path: &NotePath, from: &NotePath, to: &NotePath) -> Option<NotePath> {
    if !path.starts_with(from) {
        return None;
    }
    Some(
        path.segments()[from.depth()..]
            .iter()
            .fold(to.clone(), |acc, seg| acc.join(seg)),
    )
}

/// Handle to a navigator; clones share state.
#[derive(Clone)]
pub struct DirectoryNavigator {
    inner: Arc<NavigatorInner>,
}

impl DirectoryNavigator {
    /// Starts at the root with nothing listed; call [`navigate`](Self::navigate)
    /// or [`refresh`](Self::refresh) to load entries.
    pub fn new(store: Arc<dyn NoteStore>, scheduler: Arc<dyn Scheduler>, config: NavigatorConfig) -> Self {
        Self {
            inner: Arc::new(NavigatorInner {
                store,
                scheduler,
                config,
                state: Mutex::new(NavigatorState::default()),
            }),
        }
    }

    /// Moves to `path` and lists it.
    ///
    /// Clears the selection and any pending entries. A failed listing leaves
    /// the folder empty with an error status, so the user can still leave it.
    pub async fn navigate(&self, path: impl Into<NotePath>) -> LockInResult<()> {
        let path = path.into();
        let generation = {
            let mut st = self.inner.state.lock();
            st.current_path = path.clone();
            st.selected = None;
            st.pending.clear();
            st.list_generation += 1;
            st.loading = true;
            st.list_generation
        };
        debug!(path = %path, "Navigating");
        self.load_entries(generation, path).await
    }

    /// No-op at the root.
    pub async fn navigate_to_parent(&self) -> LockInResult<()> {
        let parent = self.inner.state.lock().current_path.parent();
        match parent {
            Some(parent) => self.navigate(parent).await,
            None => Ok(()),
        }
    }

    /// Re-lists the current folder, keeping the selection.
    pub async fn refresh(&self) -> LockInResult<()> {
        let (generation, path) = {
            let mut st = self.inner.state.lock();
            st.list_generation += 1;
            st.loading = true;
            (st.list_generation, st.current_path.clone())
        };
        self.load_entries(generation, path).await
    }

    async fn load_entries(&self, generation: u64, path: NotePath) -> LockInResult<()> {
        let result = self.inner.store.list(&path).await;

        {
            let mut st = self.inner.state.lock();
            if st.list_generation != generation || st.current_path != path {
                debug!(path = %path, "Discarding stale listing");
                return Ok(());
            }
            st.loading = false;
            match &result {
                Ok(entries) => st.entries = entries.clone(),
                Err(_) => st.entries.clear(),
            }
        }

        result
            .map(|_| ())
            .map_err(|e| self.inner.fail("Failed to load folder", e))
    }

    /// Adds an unnamed entry to the current folder. Nothing is written yet.
    pub fn begin_create(&self, kind: EntryKind) -> PendingId {
        let id = Uuid::new_v4();
        let proposed_name = match kind {
            EntryKind::File => self.inner.config.default_note_name.clone(),
            EntryKind::Directory => self.inner.config.default_folder_name.clone(),
        };
        let mut st = self.inner.state.lock();
        let parent_path = st.current_path.clone();
        st.pending.push(PendingEntry { id, kind, parent_path, proposed_name });
        id
    }

    /// Returns whether an entry with `id` was pending.
    pub fn cancel_pending(&self, id: PendingId) -> bool {
        let mut st = self.inner.state.lock();
        let before = st.pending.len();
        st.pending.retain(|p| p.id != id);
        st.pending.len() != before
    }

    /// Names a pending entry and creates it in the store.
    ///
    /// The pending entry is consumed whatever the outcome. Notes get the
    /// note extension when missing and start out with the note template.
    pub async fn commit_pending(&self, id: PendingId, name: &str) -> LockInResult<NotePath> {
        let pending = {
            let mut st = self.inner.state.lock();
            let idx = st
                .pending
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| LockInError::NotFound(format!("pending entry {}", id)))?;
            st.pending.remove(idx)
        };

        let name = match validate_name(name) {
            Ok(name) => name,
            Err(e) => return Err(self.inner.fail("Cannot create entry", e)),
        };
        let name = match pending.kind {
            EntryKind::File => self.inner.note_name(name),
            EntryKind::Directory => name.to_string(),
        };
        let path = pending.parent_path.join(&name);

        if let Err(e) = self.inner.create(pending.kind, &path).await {
            return Err(self.inner.fail(&format!("Failed to create {}", name), e));
        }
        info!(path = %path, kind = ?pending.kind, "Created entry");
        self.inner.show_status(StatusMessage::info(format!("Created {}", name)));
        self.relist_after_change(None).await;
        Ok(path)
    }

    /// Creates `note_<millis>.txt` with the note template in the current folder.
    pub async fn create_untitled_note(&self) -> LockInResult<NotePath> {
        let name = format!("note_{}.{}", Utc::now().timestamp_millis(), self.inner.config.note_extension);
        self.create_untitled(EntryKind::File, name).await
    }

    /// Creates `folder_<millis>` in the current folder.
    pub async fn create_untitled_folder(&self) -> LockInResult<NotePath> {
        let name = format!("folder_{}", Utc::now().timestamp_millis());
        self.create_untitled(EntryKind::Directory, name).await
    }

    async fn create_untitled(&self, kind: EntryKind, name: String) -> LockInResult<NotePath> {
        let path = self.current_path().join(&name);
        if let Err(e) = self.inner.create(kind, &path).await {
            return Err(self.inner.fail(&format!("Failed to create {}", name), e));
        }
        info!(path = %path, kind = ?kind, "Created entry");
        self.inner.show_status(StatusMessage::info(format!("Created {}", name)));
        self.relist_after_change(None).await;
        Ok(path)
    }

    /// Lists `target` (or the current folder) after a mutation that already
    /// succeeded. A listing failure shows up as the status line and an empty
    /// folder; it does not undo the mutation, so it is not returned.
    async fn relist_after_change(&self, target: Option<NotePath>) {
        let result = match target {
            Some(path) => self.navigate(path).await,
            None => self.refresh().await,
        };
        if let Err(e) = result {
            debug!("Listing after change failed: {}", e);
        }
    }

    /// Enters folders; selects files for the caller to open.
    pub async fn select_entry(&self, path: impl Into<NotePath>) -> LockInResult<Selection> {
        let path = path.into();
        let cached = self
            .inner
            .state
            .lock()
            .entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.kind);

        let kind = match cached {
            Some(kind) => kind,
            None => match self.inner.store.stat(&path).await {
                Ok(Some(entry)) => entry.kind,
                Ok(None) => {
                    let err = LockInError::NotFound(path.to_string());
                    return Err(self.inner.fail("Cannot open entry", err));
                }
                Err(e) => return Err(self.inner.fail("Cannot open entry", e)),
            },
        };

        match kind {
            EntryKind::Directory => {
                self.navigate(path.clone()).await?;
                Ok(Selection::Directory(path))
            }
            EntryKind::File => {
                self.inner.state.lock().selected = Some(path.clone());
                Ok(Selection::File(path))
            }
        }
    }

    pub async fn delete_entry(&self, path: impl Into<NotePath>) -> LockInResult<()> {
        let path = path.into();
        if path.is_root() {
            let err = LockInError::InvalidPath("cannot delete the root folder".into());
            return Err(self.inner.fail("Failed to delete", err));
        }
        if let Err(e) = self.inner.store.delete_entry(&path).await {
            return Err(self.inner.fail(&format!("Failed to delete {}", path), e));
        }
        {
            let mut st = self.inner.state.lock();
            if st.selected.as_ref().is_some_and(|s| s.starts_with(&path)) {
                st.selected = None;
            }
        }
        info!(path = %path, "Deleted entry");
        let name = path.name().unwrap_or_default().to_string();
        self.inner.show_status(StatusMessage::info(format!("Deleted {}", name)));

        // Deleting the folder we are in (or an ancestor) sends us to its parent.
        let current = self.current_path();
        let target = current.starts_with(&path).then(|| path.parent().unwrap_or_default());
        self.relist_after_change(target).await;
        Ok(())
    }

    /// Renames within the same folder. Notes keep their extension.
    pub async fn rename_entry(&self, path: impl Into<NotePath>, new_name: &str) -> LockInResult<NotePath> {
        let path = path.into();
        let name = match validate_name(new_name) {
            Ok(name) => name,
            Err(e) => return Err(self.inner.fail("Cannot rename", e)),
        };
        let is_note = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(&self.inner.config.note_extension));
        let name = if is_note { self.inner.note_name(name) } else { name.to_string() };
        let to = path.with_name(&name);

        if let Err(e) = self.inner.store.rename_entry(&path, &to).await {
            return Err(self.inner.fail(&format!("Failed to rename {}", path), e));
        }
        let moved_current = {
            let mut st = self.inner.state.lock();
            if let Some(selected) = st.selected.as_ref().and_then(|s| rebase(s, &path, &to)) {
                st.selected = Some(selected);
            }
            rebase(&st.current_path, &path, &to)
        };
        info!(from = %path, to = %to, "Renamed entry");
        self.inner.show_status(StatusMessage::info(format!("Renamed to {}", name)));

        self.relist_after_change(moved_current).await;
        Ok(to)
    }

    /// Shows a message that clears itself after the configured delay unless
    /// replaced first.
    pub fn set_status(&self, text: impl Into<String>) {
        self.inner.show_status(StatusMessage::info(text));
    }

    /// Shows a message that stays until another status replaces it.
    pub fn set_error_status(&self, text: impl Into<String>) {
        self.inner.show_status(StatusMessage::error(text));
    }

    pub fn clear_status(&self) {
        let mut st = self.inner.state.lock();
        st.status_generation += 1;
        st.status = None;
    }

    pub fn current_path(&self) -> NotePath {
        self.inner.state.lock().current_path.clone()
    }

    pub fn entries(&self) -> Vec<FileSystemEntry> {
        self.inner.state.lock().entries.clone()
    }

    pub fn pending(&self) -> Vec<PendingEntry> {
        self.inner.state.lock().pending.clone()
    }

    pub fn selected(&self) -> Option<NotePath> {
        self.inner.state.lock().selected.clone()
    }

    pub fn status(&self) -> Option<StatusMessage> {
        self.inner.state.lock().status.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    pub fn snapshot(&self) -> NavigatorSnapshot {
        let st = self.inner.state.lock();
        NavigatorSnapshot {
            current_path: st.current_path.clone(),
            entries: st.entries.clone(),
            pending: st.pending.clone(),
            selected: st.selected.clone(),
            status: st.status.clone(),
            loading: st.loading,
        }
    }
}
