// SPDX-License-Identifier: AGPL-3.0-or-later
//! One navigator plus at most one open note

use lockin_core::{config::EditorConfig, LockInConfig, LockInResult, NotePath, NoteStore};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::navigator::{DirectoryNavigator, Selection};
use crate::scheduler::TimerSource;
use crate::session::EditorSession;

pub struct Workbench {
    store: Arc<dyn NoteStore>,
    timers: Arc<dyn TimerSource>,
    editor_config: EditorConfig,
    navigator: DirectoryNavigator,
    session: Option<EditorSession>,
}

impl Workbench {
    pub fn new(store: Arc<dyn NoteStore>, timers: Arc<dyn TimerSource>, config: &LockInConfig) -> Self {
        let navigator = DirectoryNavigator::new(store.clone(), timers.scheduler(), config.navigator.clone());
        Self {
            store,
            timers,
            editor_config: config.editor.clone(),
            navigator,
            session: None,
        }
    }

    pub fn navigator(&self) -> &DirectoryNavigator {
        &self.navigator
    }

    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    /// Selects an entry in the navigator, opening it when it is a file.
    pub async fn select(&mut self, path: impl Into<NotePath>) -> LockInResult<Selection> {
        let selection = self.navigator.select_entry(path).await?;
        if let Selection::File(path) = &selection {
            self.open(path.clone()).await;
        }
        Ok(selection)
    }

    /// Opens `path`, closing the current note first.
    ///
    /// Reopening the note that is already open returns the live session.
    /// A load failure is reported on the navigator status line and the
    /// returned session sits in the `Error` phase.
    pub async fn open(&mut self, path: impl Into<NotePath>) -> EditorSession {
        let path = path.into();
        if let Some(session) = &self.session {
            if session.path() == &path {
                return session.clone();
            }
        }

        if let Err(e) = self.close_file().await {
            warn!("Previous note was not saved: {}", e);
            self.navigator.set_error_status(format!("Failed to save changes: {}", e));
        }

        debug!(path = %path, "Opening note");
        let session = EditorSession::open(
            path,
            self.store.clone(),
            self.timers.scheduler(),
            self.editor_config.clone(),
        )
        .await;
        if let Some(err) = session.error() {
            self.navigator.set_error_status(err.message);
        }
        self.session = Some(session.clone());
        session
    }

    /// Closes the open note, flushing unsaved edits.
    pub async fn close_file(&mut self) -> LockInResult<()> {
        match self.session.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }
}
