// SPDX-License-Identifier: AGPL-3.0-or-later
//! Local filesystem store

use async_trait::async_trait;
use lockin_core::{
    config::StorageConfig,
    entry::{sort_listing, EntryKind, FileSystemEntry},
    error::{LockInError, LockInResult},
    NotePath, NoteStore, ShareRequest, ShareTarget,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

use crate::share::LoggingShareTarget;

/// Note store rooted at a directory on the local disk
pub struct LocalStore {
    id: String,
    root: PathBuf,
    share: Arc<dyn ShareTarget>,
}

impl LocalStore {
    pub fn new(id: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            root: root.as_ref().to_path_buf(),
            share: Arc::new(LoggingShareTarget),
        }
    }

    pub fn from_config(config: &StorageConfig) -> LockInResult<Self> {
        Ok(Self::new("local", config.root_dir()?))
    }

    pub fn with_share_target(mut self, share: Arc<dyn ShareTarget>) -> Self {
        self.share = share;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn to_real_path(&self, path: &NotePath) -> PathBuf {
        let mut real = self.root.clone();
        for seg in path.segments() {
            real.push(seg);
        }
        real
    }

    async fn entry_for(&self, path: &NotePath, real: &Path) -> LockInResult<Option<FileSystemEntry>> {
        let meta = match fs::metadata(real).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_error(e, path)),
        };

        let mut entry = if meta.is_dir() {
            FileSystemEntry::directory(path.clone())
        } else {
            FileSystemEntry::file(path.clone()).with_size(meta.len())
        };
        if let Ok(modified) = meta.modified() {
            entry = entry.with_modified(modified.into());
        }
        Ok(Some(entry))
    }
}

fn read_error(err: std::io::Error, path: &NotePath) -> LockInError {
    match err.kind() {
        ErrorKind::NotFound => LockInError::NotFound(path.to_string()),
        ErrorKind::PermissionDenied => LockInError::StoreUnavailable(format!("{}: {}", path, err)),
        _ => LockInError::Io(err),
    }
}

fn write_error(err: std::io::Error, path: &NotePath) -> LockInError {
    LockInError::WriteError(format!("{}: {}", path, err))
}

#[async_trait]
impl NoteStore for LocalStore {
    fn id(&self) -> &str {
        &self.id
    }

    async fn is_available(&self) -> bool {
        fs::metadata(&self.root).await.map(|m| m.is_dir()).unwrap_or(false)
    }

    async fn list(&self, path: &NotePath) -> LockInResult<Vec<FileSystemEntry>> {
        let real = self.to_real_path(path);
        let mut read_dir = match fs::read_dir(&real).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) if real.is_file() => {
                debug!("Listing a file as a directory {}: {}", path, e);
                return Ok(Vec::new());
            }
            Err(e) => return Err(LockInError::StoreUnavailable(format!("{}: {}", path, e))),
        };

        let mut entries = Vec::new();
        while let Some(dirent) = read_dir.next_entry().await? {
            let name = dirent.file_name().to_string_lossy().into_owned();
            let child = path.join(&name);
            // Entries removed between readdir and stat are skipped.
            if let Some(entry) = self.entry_for(&child, &dirent.path()).await? {
                entries.push(entry);
            }
        }

        sort_listing(&mut entries);
        Ok(entries)
    }

    async fn stat(&self, path: &NotePath) -> LockInResult<Option<FileSystemEntry>> {
        self.entry_for(path, &self.to_real_path(path)).await
    }

    async fn create_directory(&self, path: &NotePath) -> LockInResult<()> {
        let real = self.to_real_path(path);
        match fs::create_dir_all(&real).await {
            Ok(()) => {
                info!("Folder created: {}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists || real.is_file() => {
                Err(LockInError::Conflict(format!("{} exists and is not a folder", path)))
            }
            Err(e) => Err(write_error(e, path)),
        }
    }

    async fn read_file(&self, path: &NotePath) -> LockInResult<String> {
        match self.stat(path).await? {
            Some(entry) if entry.kind == EntryKind::File => {}
            _ => return Err(LockInError::NotFound(path.to_string())),
        }
        fs::read_to_string(self.to_real_path(path))
            .await
            .map_err(|e| read_error(e, path))
    }

    async fn write_file(&self, path: &NotePath, text: &str) -> LockInResult<()> {
        if path.is_root() {
            return Err(LockInError::InvalidPath("cannot write to the root folder".into()));
        }
        let real = self.to_real_path(path);
        if real.is_dir() {
            return Err(LockInError::WriteError(format!("{} is a folder", path)));
        }
        fs::write(&real, text.as_bytes())
            .await
            .map_err(|e| write_error(e, path))?;
        info!("File saved: {}", path);
        Ok(())
    }

    async fn delete_entry(&self, path: &NotePath) -> LockInResult<()> {
        let real = self.to_real_path(path);
        let result = match fs::symlink_metadata(&real).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&real).await,
            Ok(_) => fs::remove_file(&real).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Deleted: {}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(write_error(e, path)),
        }
    }

    async fn rename_entry(&self, from: &NotePath, to: &NotePath) -> LockInResult<()> {
        if from == to {
            return Ok(());
        }
        if to.starts_with(from) {
            return Err(LockInError::Conflict(format!("cannot move {} into itself", from)));
        }

        let src_real = self.to_real_path(from);
        let dst_real = self.to_real_path(to);

        if self.stat(from).await?.is_none() {
            return Err(LockInError::NotFound(from.to_string()));
        }
        if self.stat(to).await?.is_some() {
            return Err(LockInError::Conflict(format!("{} already exists", to)));
        }

        fs::rename(&src_real, &dst_real).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => LockInError::NotFound(to.to_string()),
            ErrorKind::AlreadyExists => LockInError::Conflict(to.to_string()),
            _ => write_error(e, to),
        })?;
        info!("Renamed: {} -> {}", from, to);
        Ok(())
    }

    async fn share_file(&self, path: &NotePath) -> LockInResult<()> {
        match self.stat(path).await? {
            Some(entry) if entry.is_file() => {}
            _ => return Err(LockInError::NotFound(path.to_string())),
        }
        let request = ShareRequest::text(path.clone()).with_location(self.to_real_path(path));
        self.share.share(request).await
    }
}
