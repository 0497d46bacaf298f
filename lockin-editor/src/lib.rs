// SPDX-License-Identifier: AGPL-3.0-or-later
//! LockIn Editor
//!
//! Editing sessions with debounced autosave and bounded undo history, and a
//! folder navigator, both driven by an injectable timer source.

pub mod history;
pub mod navigator;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod workbench;

pub use history::{EditHistory, Snapshot, DEFAULT_HISTORY_LIMIT};
pub use navigator::{DirectoryNavigator, NavigatorSnapshot, PendingEntry, PendingId, Selection, StatusLevel, StatusMessage};
pub use scheduler::{ManualClock, Scheduler, TimerKey, TimerSource, TokioTimers};
pub use session::{EditorSession, ErrorOrigin, SessionError, SessionPhase, SessionSnapshot};
pub use stats::TextStats;
pub use workbench::Workbench;
