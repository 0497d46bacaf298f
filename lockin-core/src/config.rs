// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process-wide configuration
//!
//! Loaded once at startup (from TOML or defaults) and passed explicitly to
//! the store adapter, the bootstrap, and the editor components.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LockInError, LockInResult};

pub const DEFAULT_ROOT_NAME: &str = "LockIn";
pub const DEFAULT_INIT_FLAG_KEY: &str = "@lockin_folder_initialized";
pub const DEFAULT_NOTE_TEMPLATE: &str = "# New Note\n\nStart writing here...\n";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LockInConfig {
    pub storage: StorageConfig,
    pub editor: EditorConfig,
    pub navigator: NavigatorConfig,
}

impl LockInConfig {
    pub fn load(path: impl AsRef<Path>) -> LockInResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LockInError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> LockInResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Where the note tree lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Parent of the root folder; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    pub root_name: String,
    pub init_flag_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            root_name: DEFAULT_ROOT_NAME.to_string(),
            init_flag_key: DEFAULT_INIT_FLAG_KEY.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn data_dir(&self) -> LockInResult<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        directories::ProjectDirs::from("dev", "hyperpolymath", "lockin")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| LockInError::StoreUnavailable("no home directory".into()))
    }

    pub fn root_dir(&self) -> LockInResult<PathBuf> {
        Ok(self.data_dir()?.join(&self.root_name))
    }

    /// Location of the preferences database, next to the root folder
    pub fn preferences_dir(&self) -> LockInResult<PathBuf> {
        Ok(self.data_dir()?.join("preferences"))
    }
}

/// Editor session timing and history bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub history_debounce_ms: u64,
    pub autosave_debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            history_debounce_ms: 1000,
            autosave_debounce_ms: 1500,
        }
    }
}

impl EditorConfig {
    pub fn history_debounce(&self) -> Duration {
        Duration::from_millis(self.history_debounce_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    pub status_clear_ms: u64,
    pub default_note_name: String,
    pub default_folder_name: String,
    /// Extension appended to note names that lack it
    pub note_extension: String,
    pub note_template: String,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            status_clear_ms: 2000,
            default_note_name: "Untitled Note.txt".to_string(),
            default_folder_name: "Untitled Folder".to_string(),
            note_extension: "txt".to_string(),
            note_template: DEFAULT_NOTE_TEMPLATE.to_string(),
        }
    }
}

impl NavigatorConfig {
    pub fn status_clear(&self) -> Duration {
        Duration::from_millis(self.status_clear_ms)
    }
}
