// SPDX-License-Identifier: AGPL-3.0-or-later
//! Note store trait

use async_trait::async_trait;

use crate::{
    entry::{EntryKind, FileSystemEntry},
    error::LockInResult,
    NotePath,
};

/// Hierarchical text store rooted at the logical LockIn folder.
///
/// Every call reflects the current state of the underlying storage; there
/// is no caching layer. Listings are sorted with directories first.
#[async_trait]
pub trait NoteStore: Send + Sync {
    fn id(&self) -> &str;

    async fn is_available(&self) -> bool;

    /// Entries directly inside `path`. A missing directory lists as empty.
    async fn list(&self, path: &NotePath) -> LockInResult<Vec<FileSystemEntry>>;

    /// Metadata for `path`, or `None` if nothing exists there.
    async fn stat(&self, path: &NotePath) -> LockInResult<Option<FileSystemEntry>>;

    /// Creates `path` and any missing parents; succeeds if it already exists.
    async fn create_directory(&self, path: &NotePath) -> LockInResult<()>;

    async fn read_file(&self, path: &NotePath) -> LockInResult<String>;

    /// Whole-file create or overwrite.
    async fn write_file(&self, path: &NotePath, text: &str) -> LockInResult<()>;

    /// Removes a file or a folder with its contents; absent paths succeed.
    async fn delete_entry(&self, path: &NotePath) -> LockInResult<()>;

    async fn rename_entry(&self, from: &NotePath, to: &NotePath) -> LockInResult<()>;

    /// Hands the file to the platform share facility.
    async fn share_file(&self, path: &NotePath) -> LockInResult<()>;
}

/// Names of the folders directly inside `path`
pub async fn list_subfolders(store: &dyn NoteStore, path: &NotePath) -> LockInResult<Vec<String>> {
    list_names(store, path, EntryKind::Directory).await
}

/// Names of the files directly inside `path`
pub async fn list_files(store: &dyn NoteStore, path: &NotePath) -> LockInResult<Vec<String>> {
    list_names(store, path, EntryKind::File).await
}

async fn list_names(store: &dyn NoteStore, path: &NotePath, kind: EntryKind) -> LockInResult<Vec<String>> {
    Ok(store
        .list(path)
        .await?
        .into_iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.name)
        .collect())
}
