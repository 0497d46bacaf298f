// SPDX-License-Identifier: AGPL-3.0-or-later
//! Preference stores for LockIn
//!
//! Supports:
//! - sled: embedded KV on disk (default)
//! - memory: process-local map for tests

use async_trait::async_trait;
use lockin_core::{LockInResult, Preferences};
use parking_lot::RwLock;
use std::collections::HashMap;

#[cfg(feature = "sled")]
mod sled_backend;

#[cfg(feature = "sled")]
pub use sled_backend::SledPreferences;

/// Preferences held in memory only
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

#[async_trait]
impl Preferences for MemoryPreferences {
    async fn get(&self, key: &str) -> LockInResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> LockInResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> LockInResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}
