// SPDX-License-Identifier: AGPL-3.0-or-later
//! First-run setup of the LockIn root folder
//!
//! Whether the root has been set up is remembered in the preference store,
//! not inferred from the file tree, so a user deleting `README.txt` does not
//! trigger re-initialisation.

use chrono::Local;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    config::StorageConfig, error::LockInResult, NotePath, NoteStore, Preferences,
};

pub const README_NAME: &str = "README.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    AlreadyInitialized,
}

pub struct Bootstrap {
    store: Arc<dyn NoteStore>,
    prefs: Arc<dyn Preferences>,
    flag_key: String,
}

impl Bootstrap {
    pub fn new(store: Arc<dyn NoteStore>, prefs: Arc<dyn Preferences>, config: &StorageConfig) -> Self {
        Self { store, prefs, flag_key: config.init_flag_key.clone() }
    }

    pub async fn is_initialized(&self) -> LockInResult<bool> {
        Ok(self.prefs.get(&self.flag_key).await?.as_deref() == Some("true"))
    }

    pub async fn initialize(&self) -> LockInResult<InitOutcome> {
        if self.is_initialized().await? {
            debug!("LockIn folder already initialized");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        self.store.create_directory(&NotePath::root()).await?;
        self.store
            .write_file(&NotePath::new(README_NAME), &readme_text())
            .await?;
        self.prefs.set(&self.flag_key, "true").await?;

        info!(store = self.store.id(), "LockIn folder initialized");
        Ok(InitOutcome::Initialized)
    }

    /// Forgets the initialisation flag; the file tree is left alone.
    pub async fn reset(&self) -> LockInResult<()> {
        self.prefs.remove(&self.flag_key).await?;
        info!("LockIn initialization flag reset");
        Ok(())
    }
}

fn readme_text() -> String {
    format!(
        "Welcome to LockIn!\n\nThis folder is used by the LockIn app to store your files.\n\nCreated: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}
