// SPDX-License-Identifier: AGPL-3.0-or-later
//! First-run setup against the local store and in-memory preferences

use lockin_core::{
    bootstrap::README_NAME, config::StorageConfig, Bootstrap, InitOutcome, NotePath, NoteStore,
    Preferences,
};
use lockin_prefs::MemoryPreferences;
use lockin_providers::LocalStore;
use std::sync::Arc;
use tempfile::TempDir;

fn setup() -> (TempDir, Arc<LocalStore>, Arc<MemoryPreferences>, Bootstrap) {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig { data_dir: Some(dir.path().to_path_buf()), ..StorageConfig::default() };
    let store = Arc::new(LocalStore::from_config(&config).unwrap());
    let prefs = Arc::new(MemoryPreferences::new());
    let bootstrap = Bootstrap::new(store.clone(), prefs.clone(), &config);
    (dir, store, prefs, bootstrap)
}

#[tokio::test]
async fn test_initialize_creates_root_and_readme_once() {
    let (dir, store, prefs, bootstrap) = setup();
    assert!(!bootstrap.is_initialized().await.unwrap());

    assert_eq!(bootstrap.initialize().await.unwrap(), InitOutcome::Initialized);
    assert!(dir.path().join("LockIn").join(README_NAME).is_file());
    let readme = store.read_file(&NotePath::new(README_NAME)).await.unwrap();
    assert!(readme.starts_with("Welcome to LockIn!"));
    assert_eq!(prefs.get("@lockin_folder_initialized").await.unwrap().as_deref(), Some("true"));

    // The flag, not the file, gates re-initialisation.
    store.delete_entry(&NotePath::new(README_NAME)).await.unwrap();
    assert_eq!(bootstrap.initialize().await.unwrap(), InitOutcome::AlreadyInitialized);
    assert!(store.stat(&NotePath::new(README_NAME)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reset_allows_initializing_again() {
    let (_dir, store, _prefs, bootstrap) = setup();
    bootstrap.initialize().await.unwrap();
    store.write_file(&NotePath::new("mine.txt"), "keep").await.unwrap();

    bootstrap.reset().await.unwrap();
    assert!(!bootstrap.is_initialized().await.unwrap());
    assert_eq!(store.read_file(&NotePath::new("mine.txt")).await.unwrap(), "keep");

    assert_eq!(bootstrap.initialize().await.unwrap(), InitOutcome::Initialized);
    assert!(bootstrap.is_initialized().await.unwrap());
}
