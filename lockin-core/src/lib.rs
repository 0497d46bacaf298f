// SPDX-License-Identifier: AGPL-3.0-or-later
//! LockIn Core
//!
//! Shared types and the storage, preference and share abstractions behind
//! the note editor and directory navigator.

pub mod bootstrap;
pub mod config;
pub mod entry;
pub mod error;
pub mod markup;
pub mod path;
pub mod preferences;
pub mod share;
pub mod store;

pub use bootstrap::{Bootstrap, InitOutcome};
pub use config::LockInConfig;
pub use entry::{EntryKind, FileSystemEntry};
pub use error::{LockInError, LockInResult};
pub use markup::MarkupDocument;
pub use path::NotePath;
pub use preferences::Preferences;
pub use share::{ShareRequest, ShareTarget};
pub use store::NoteStore;
