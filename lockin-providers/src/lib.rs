// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage providers for LockIn
//!
//! `LocalStore` keeps notes on disk below the configured root folder;
//! `MemoryStore` keeps them in memory for tests and previews.

mod local;
mod memory;
pub mod share;

pub use local::LocalStore;
pub use memory::{MemoryStore, StoreOp};
pub use share::{CommandShareTarget, LoggingShareTarget, RecordingShareTarget};
