// SPDX-License-Identifier: AGPL-3.0-or-later
//! Drawing/writing overlay sidecar files
//!
//! A note `Notes/todo.txt` may have a sidecar `Notes/todo.markup.json`. The
//! sidecar is optional; its absence is the normal state of a fresh note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::LockInResult, NoteStore, NotePath};

pub const MARKUP_SUFFIX: &str = ".markup.json";
pub const MARKUP_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One freehand stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkPath {
    pub points: Vec<Point>,
    pub color: String,
    pub width: f64,
    /// Unix millis when the stroke was drawn
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupMetadata {
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub version: String,
}

impl MarkupMetadata {
    pub fn now() -> Self {
        let now = Utc::now();
        Self { created_at: now, last_modified: now, version: MARKUP_VERSION.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupDocument {
    pub text: String,
    #[serde(default)]
    pub drawing_paths: Vec<InkPath>,
    #[serde(default)]
    pub writing_paths: Vec<InkPath>,
    #[serde(default)]
    pub metadata: Option<MarkupMetadata>,
}

impl MarkupDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            drawing_paths: Vec::new(),
            writing_paths: Vec::new(),
            metadata: Some(MarkupMetadata::now()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.drawing_paths.is_empty() && self.writing_paths.is_empty()
    }

    pub fn touch(&mut self) {
        match &mut self.metadata {
            Some(meta) => meta.last_modified = Utc::now(),
            None => self.metadata = Some(MarkupMetadata::now()),
        }
    }
}

/// Sidecar location for a note; a trailing `.txt` is replaced.
pub fn sidecar_path(note: &NotePath) -> NotePath {
    let name = note.name().unwrap_or_default();
    let base = name.strip_suffix(".txt").unwrap_or(name);
    note.with_name(format!("{}{}", base, MARKUP_SUFFIX))
}

pub fn is_sidecar(path: &NotePath) -> bool {
    path.name().is_some_and(|n| n.ends_with(MARKUP_SUFFIX))
}

/// Reads the sidecar for `note`. Missing or unreadable sidecars yield `None`.
pub async fn load_sidecar(store: &dyn NoteStore, note: &NotePath) -> Option<MarkupDocument> {
    let path = sidecar_path(note);
    match store.stat(&path).await {
        Ok(Some(entry)) if entry.is_file() => {}
        Ok(_) => return None,
        Err(e) => {
            warn!("Could not stat markup sidecar {}: {}", path, e);
            return None;
        }
    }

    let text = match store.read_file(&path).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not read markup sidecar {}: {}", path, e);
            return None;
        }
    };

    match serde_json::from_str(&text) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!("Ignoring malformed markup sidecar {}: {}", path, e);
            None
        }
    }
}

pub async fn save_sidecar(store: &dyn NoteStore, note: &NotePath, doc: &MarkupDocument) -> LockInResult<()> {
    let json = serde_json::to_string_pretty(doc)?;
    store.write_file(&sidecar_path(note), &json).await
}
