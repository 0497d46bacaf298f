// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sled database backend for preferences

use async_trait::async_trait;
use lockin_core::{LockInError, LockInResult, Preferences};
use sled::Db;
use std::path::Path;
use tracing::debug;

fn db_error(e: sled::Error) -> LockInError {
    LockInError::Preferences(e.to_string())
}

/// Sled-based preference store
pub struct SledPreferences {
    db: Db,
}

impl SledPreferences {
    /// Open or create a sled database at the given path
    pub fn open(path: impl AsRef<Path>) -> LockInResult<Self> {
        let db = sled::open(path).map_err(db_error)?;
        Ok(Self { db })
    }

    /// Temporary database, removed on drop
    pub fn temporary() -> LockInResult<Self> {
        let db = sled::Config::new().temporary(true).open().map_err(db_error)?;
        Ok(Self { db })
    }

    /// Flush to disk
    pub fn flush(&self) -> LockInResult<()> {
        self.db.flush().map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl Preferences for SledPreferences {
    async fn get(&self, key: &str) -> LockInResult<Option<String>> {
        let value = self.db.get(key.as_bytes()).map_err(db_error)?;
        value
            .map(|v| {
                String::from_utf8(v.to_vec())
                    .map_err(|e| LockInError::Preferences(format!("{}: {}", key, e)))
            })
            .transpose()
    }

    async fn set(&self, key: &str, value: &str) -> LockInResult<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(db_error)?;
        self.db.flush_async().await.map_err(db_error)?;
        debug!(key, "Preference stored");
        Ok(())
    }

    async fn remove(&self, key: &str) -> LockInResult<()> {
        self.db.remove(key.as_bytes()).map_err(db_error)?;
        self.db.flush_async().await.map_err(db_error)?;
        Ok(())
    }
}
