// SPDX-License-Identifier: AGPL-3.0-or-later
//! Editor session behaviour against an in-memory store and a manual clock

use lockin_core::{config::EditorConfig, markup::MarkupDocument, LockInError, NotePath, NoteStore};
use lockin_editor::{
    EditorSession, ErrorOrigin, ManualClock, SessionPhase, TextStats, TimerSource,
};
use lockin_providers::{MemoryStore, RecordingShareTarget, StoreOp};
use std::sync::Arc;
use std::time::Duration;

const HISTORY: Duration = Duration::from_millis(1000);
const AUTOSAVE: Duration = Duration::from_millis(1500);

fn store_with(path: &str, text: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_file(path, text);
    store
}

async fn open(store: &Arc<MemoryStore>, clock: &ManualClock, path: &str) -> EditorSession {
    EditorSession::open(NotePath::new(path), store.clone(), clock.scheduler(), EditorConfig::default()).await
}

async fn wait_for_calls(store: &MemoryStore, op: StoreOp, n: usize) {
    for _ in 0..100 {
        if store.calls(op) >= n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("{:?} was never called {} times", op, n);
}

#[tokio::test]
async fn test_open_loads_content_and_single_snapshot() {
    let store = store_with("a.txt", "hello");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    assert_eq!(session.phase(), SessionPhase::Clean);
    assert_eq!(session.content(), "hello");
    assert_eq!(session.saved_content(), "hello");
    assert!(!session.is_dirty());
    assert_eq!(session.history_contents(), ["hello"]);
    assert!(!session.can_undo());
    assert!(!session.can_redo());
}

#[tokio::test]
async fn test_dirty_until_autosave_completes() {
    let store = store_with("a.txt", "hello");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("hello world").unwrap();
    assert!(session.is_dirty());
    assert_eq!(session.phase(), SessionPhase::Dirty);

    clock.advance(AUTOSAVE - Duration::from_millis(1)).await;
    assert!(session.is_dirty());
    assert_eq!(store.calls(StoreOp::WriteFile), 0);

    clock.advance(Duration::from_millis(1)).await;
    assert!(!session.is_dirty());
    assert_eq!(session.phase(), SessionPhase::Clean);
    assert_eq!(store.contents("a.txt").as_deref(), Some("hello world"));
    assert_eq!(session.history_contents(), ["hello", "hello world"]);
}

#[tokio::test]
async fn test_rapid_typing_debounces_history_and_saves() {
    let store = store_with("a.txt", "");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    for text in ["M", "Mi", "Mil", "Milk"] {
        session.set_content(text).unwrap();
        clock.advance(Duration::from_millis(300)).await;
    }
    assert_eq!(session.history_len(), 1);
    assert_eq!(store.calls(StoreOp::WriteFile), 0);

    clock.run_until_idle().await;
    assert_eq!(session.history_contents(), ["", "Milk"]);
    assert_eq!(store.writes(), vec![(NotePath::new("a.txt"), "Milk".to_string())]);
}

#[tokio::test]
async fn test_undo_redo_at_bounds_do_nothing() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    assert!(!session.undo().await.unwrap());
    assert!(!session.redo().await.unwrap());
    assert_eq!(session.content(), "A");
    assert_eq!(session.history_index(), 0);
    assert_eq!(store.calls(StoreOp::WriteFile), 0);
}

#[tokio::test]
async fn test_undo_persists_immediately_and_cancels_autosave() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("B").unwrap();
    clock.advance(HISTORY).await;
    assert!(session.can_undo());

    assert!(session.undo().await.unwrap());
    assert_eq!(session.content(), "A");
    assert_eq!(store.contents("a.txt").as_deref(), Some("A"));
    assert!(!session.is_dirty());
    assert_eq!(clock.pending(), 0);

    assert!(session.redo().await.unwrap());
    assert_eq!(session.content(), "B");
    assert_eq!(store.contents("a.txt").as_deref(), Some("B"));

    clock.run_until_idle().await;
    assert_eq!(store.writes().len(), 2);
}

#[tokio::test]
async fn test_edit_after_undo_drops_redo_branch() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("B").unwrap();
    clock.advance(HISTORY).await;
    session.set_content("C").unwrap();
    clock.advance(HISTORY).await;
    assert_eq!(session.history_contents(), ["A", "B", "C"]);
    assert_eq!(session.history_index(), 2);

    session.undo().await.unwrap();
    assert_eq!(session.content(), "B");
    assert_eq!(session.history_index(), 1);

    session.set_content("D").unwrap();
    clock.advance(HISTORY).await;
    assert_eq!(session.history_contents(), ["A", "B", "D"]);
    assert!(!session.can_redo());
}

#[tokio::test]
async fn test_history_is_capped_at_fifty() {
    let store = store_with("a.txt", "0");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    for i in 1..=60 {
        session.set_content(i.to_string()).unwrap();
        clock.advance(HISTORY).await;
    }

    let expected: Vec<String> = (11..=60).map(|i| i.to_string()).collect();
    assert_eq!(session.history_len(), 50);
    assert_eq!(session.history_index(), 49);
    assert_eq!(session.history_contents(), expected);
}

#[tokio::test]
async fn test_only_last_debounced_save_lands() {
    let store = store_with("a.txt", "");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("X").unwrap();
    clock.advance(Duration::from_millis(500)).await;
    session.set_content("Y").unwrap();
    clock.run_until_idle().await;

    assert_eq!(session.saved_content(), "Y");
    assert_eq!(store.writes(), vec![(NotePath::new("a.txt"), "Y".to_string())]);
}

#[tokio::test]
async fn test_edit_during_inflight_save_stays_dirty() {
    let store = store_with("a.txt", "");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    store.pause(StoreOp::WriteFile);
    session.set_content("X").unwrap();
    let ticker = clock.clone();
    let save = tokio::spawn(async move { ticker.advance(AUTOSAVE).await });
    wait_for_calls(&store, StoreOp::WriteFile, 1).await;
    assert_eq!(session.phase(), SessionPhase::Saving);

    session.set_content("Y").unwrap();
    store.resume(StoreOp::WriteFile);
    save.await.unwrap();

    assert_eq!(session.saved_content(), "X");
    assert_eq!(session.content(), "Y");
    assert!(session.is_dirty());

    clock.run_until_idle().await;
    assert_eq!(session.saved_content(), "Y");
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn test_autosave_failure_is_sticky_until_retry() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    store.fail_next(StoreOp::WriteFile, LockInError::WriteError("disk full".into()));
    session.set_content("B").unwrap();
    clock.run_until_idle().await;

    let err = session.error().unwrap();
    assert_eq!(err.origin, ErrorOrigin::Save);
    assert!(err.message.contains("disk full"));
    assert!(err.retryable);
    assert_eq!(session.phase(), SessionPhase::Error);
    assert!(session.is_dirty());

    clock.advance(Duration::from_secs(60)).await;
    assert!(session.error().is_some());

    session.save_now().await.unwrap();
    assert!(session.error().is_none());
    assert_eq!(session.phase(), SessionPhase::Clean);
    assert_eq!(store.contents("a.txt").as_deref(), Some("B"));
}

#[tokio::test]
async fn test_discard_restores_saved_content() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("B").unwrap();
    clock.advance(HISTORY).await;
    session.discard().unwrap();

    assert_eq!(session.content(), "A");
    assert!(!session.is_dirty());
    assert_eq!(session.history_contents(), ["A"]);
    assert_eq!(clock.pending(), 0);
    assert_eq!(store.calls(StoreOp::ReadFile), 1);
    assert_eq!(store.calls(StoreOp::WriteFile), 0);
}

#[tokio::test]
async fn test_discard_during_inflight_save_rewrites_saved_text() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    store.pause(StoreOp::WriteFile);
    session.set_content("B").unwrap();
    let ticker = clock.clone();
    let save = tokio::spawn(async move { ticker.advance(AUTOSAVE).await });
    wait_for_calls(&store, StoreOp::WriteFile, 1).await;

    session.discard().unwrap();
    assert_eq!(session.content(), "A");
    store.resume(StoreOp::WriteFile);
    save.await.unwrap();

    assert_eq!(session.content(), "A");
    assert_eq!(session.saved_content(), "A");
    assert!(!session.is_dirty());
    assert_eq!(session.phase(), SessionPhase::Clean);
    assert_eq!(store.contents("a.txt").as_deref(), Some("A"));
    assert_eq!(
        store.writes(),
        vec![(NotePath::new("a.txt"), "B".to_string()), (NotePath::new("a.txt"), "A".to_string())]
    );
    assert_eq!(clock.pending(), 0);
}

#[tokio::test]
async fn test_share_saves_dirty_content_first() {
    let recorder = Arc::new(RecordingShareTarget::new());
    let store = Arc::new(MemoryStore::new().with_share_target(recorder.clone()));
    store.insert_file("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("B").unwrap();
    session.share().await.unwrap();

    assert_eq!(store.contents("a.txt").as_deref(), Some("B"));
    assert_eq!(recorder.len(), 1);
    let requests = recorder.requests();
    let request = &requests[0];
    assert_eq!(request.path, NotePath::new("a.txt"));
    assert_eq!(request.mime_type, "text/plain");
    assert_eq!(clock.pending(), 1, "history capture still pending");
}

#[tokio::test]
async fn test_share_aborts_when_forced_save_fails() {
    let recorder = Arc::new(RecordingShareTarget::new());
    let store = Arc::new(MemoryStore::new().with_share_target(recorder.clone()));
    store.insert_file("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("B").unwrap();
    store.fail_next(StoreOp::WriteFile, LockInError::WriteError("read-only".into()));
    let err = session.share().await.unwrap_err();

    assert!(matches!(err, LockInError::WriteError(_)));
    assert_eq!(store.calls(StoreOp::ShareFile), 0);
    assert!(recorder.is_empty());
    assert_eq!(session.error().unwrap().origin, ErrorOrigin::Save);
}

#[tokio::test]
async fn test_share_clean_note_skips_save() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.share().await.unwrap();
    assert_eq!(store.calls(StoreOp::WriteFile), 0);
    assert_eq!(store.calls(StoreOp::ShareFile), 1);
}

#[tokio::test]
async fn test_open_missing_file_enters_error() {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new();
    let session = open(&store, &clock, "missing.txt").await;

    assert_eq!(session.phase(), SessionPhase::Error);
    let err = session.error().unwrap();
    assert_eq!(err.origin, ErrorOrigin::Load);
    assert!(!err.retryable);
    assert!(matches!(session.set_content("x"), Err(LockInError::NotLoaded(_))));

    store.insert_file("missing.txt", "found");
    session.load().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Clean);
    assert_eq!(session.content(), "found");
    assert!(session.error().is_none());
}

#[tokio::test]
async fn test_close_flushes_pending_save() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("draft").unwrap();
    session.close().await.unwrap();

    assert_eq!(store.contents("a.txt").as_deref(), Some("draft"));
    assert_eq!(session.phase(), SessionPhase::Closed);
    assert_eq!(clock.pending(), 0);
    assert!(matches!(session.set_content("late"), Err(LockInError::SessionClosed)));

    clock.run_until_idle().await;
    assert_eq!(store.writes().len(), 1);
}

#[tokio::test]
async fn test_close_clean_session_writes_nothing() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.close().await.unwrap();
    session.close().await.unwrap();
    assert_eq!(store.calls(StoreOp::WriteFile), 0);
}

#[tokio::test]
async fn test_dropped_session_never_saves() {
    let store = store_with("a.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("B").unwrap();
    assert_eq!(clock.pending(), 2);
    drop(session);

    assert_eq!(clock.pending(), 0);
    clock.run_until_idle().await;
    assert_eq!(store.calls(StoreOp::WriteFile), 0);
}

#[tokio::test]
async fn test_superseded_load_result_is_ignored() {
    let store = store_with("a.txt", "old");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    store.pause(StoreOp::ReadFile);
    let first = session.clone();
    let stale = tokio::spawn(async move { first.load().await });
    wait_for_calls(&store, StoreOp::ReadFile, 2).await;
    let second = session.clone();
    let fresh = tokio::spawn(async move { second.load().await });
    wait_for_calls(&store, StoreOp::ReadFile, 3).await;

    // The first load through the gate fails, but it has been superseded.
    store.fail_next(StoreOp::ReadFile, LockInError::StoreUnavailable("gone".into()));
    store.step(StoreOp::ReadFile);
    stale.await.unwrap().unwrap();
    assert_eq!(session.phase(), SessionPhase::Loading);
    assert!(session.error().is_none());

    store.resume(StoreOp::ReadFile);
    fresh.await.unwrap().unwrap();
    assert_eq!(session.phase(), SessionPhase::Clean);
    assert_eq!(session.content(), "old");
    assert_eq!(session.history_contents(), ["old"]);
}

#[tokio::test]
async fn test_missing_or_malformed_sidecar_does_not_fail_load() {
    let store = store_with("a.txt", "A");
    store.insert_file("b.txt", "B");
    store.insert_file("b.markup.json", "{ not json");
    let clock = ManualClock::new();

    let a = open(&store, &clock, "a.txt").await;
    assert_eq!(a.phase(), SessionPhase::Clean);
    assert!(a.markup().is_none());

    let b = open(&store, &clock, "b.txt").await;
    assert_eq!(b.phase(), SessionPhase::Clean);
    assert_eq!(b.content(), "B");
    assert!(b.markup().is_none());
}

#[tokio::test]
async fn test_markup_sidecar_round_trip() {
    let store = store_with("Notes/todo.txt", "A");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "Notes/todo.txt").await;

    session.save_markup(MarkupDocument::new("A")).await.unwrap();
    assert!(store.contents("Notes/todo.markup.json").unwrap().contains("\"drawingPaths\""));
    assert_eq!(store.contents("Notes/todo.txt").as_deref(), Some("A"));

    let reopened = open(&store, &clock, "Notes/todo.txt").await;
    assert_eq!(reopened.markup().map(|doc| doc.text), Some("A".to_string()));
}

#[tokio::test]
async fn test_snapshot_reports_stats() {
    let store = store_with("a.txt", "Milk\nEggs\n");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Clean);
    assert_eq!(snapshot.stats, TextStats { chars: 10, words: 2, lines: 3 });
    assert!(!snapshot.is_dirty);
    assert_eq!(session.stats(), snapshot.stats);
}

#[tokio::test]
async fn test_store_reads_reflect_latest_save() {
    let store = store_with("a.txt", "");
    let clock = ManualClock::new();
    let session = open(&store, &clock, "a.txt").await;

    session.set_content("Milk\nEggs").unwrap();
    clock.advance(AUTOSAVE).await;
    assert_eq!(store.read_file(&NotePath::new("a.txt")).await.unwrap(), "Milk\nEggs");
}
