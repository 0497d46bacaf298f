// SPDX-License-Identifier: AGPL-3.0-or-later
//! Directory listing entries

use crate::NotePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

/// A file or folder as seen by one listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    pub name: String,
    pub path: NotePath,
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileSystemEntry {
    pub fn file(path: NotePath) -> Self {
        Self::new(path, EntryKind::File)
    }

    pub fn directory(path: NotePath) -> Self {
        Self::new(path, EntryKind::Directory)
    }

    fn new(path: NotePath, kind: EntryKind) -> Self {
        let name = path.name().unwrap_or_default().to_string();
        Self { name, path, kind, size: None, modified_at: None }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified);
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Case-folding name comparison; lowercase sorts before uppercase on ties.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let fold = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
    fold(a)
        .cmp(&fold(b))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

/// Directories first, then files, each group ordered by [`locale_cmp`].
pub fn sort_listing(entries: &mut [FileSystemEntry]) {
    entries.sort_by(|a, b| match (a.is_directory(), b.is_directory()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => locale_cmp(&a.name, &b.name),
    });
}
