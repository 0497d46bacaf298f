// SPDX-License-Identifier: AGPL-3.0-or-later
//! Small persisted key-value settings

use async_trait::async_trait;

use crate::error::LockInResult;

/// String key-value store for flags that outlive the process
#[async_trait]
pub trait Preferences: Send + Sync {
    async fn get(&self, key: &str) -> LockInResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> LockInResult<()>;
    async fn remove(&self, key: &str) -> LockInResult<()>;
}
