// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory note store
//!
//! Behaves like [`crate::LocalStore`] but keeps the tree in a map. Tests use
//! the extra controls to count calls, inject failures, and hold operations
//! in flight until released.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lockin_core::{
    entry::{sort_listing, FileSystemEntry},
    error::{LockInError, LockInResult},
    NotePath, NoteStore, ShareRequest, ShareTarget,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::share::RecordingShareTarget;

/// Store operations, for counting and gating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Stat,
    CreateDirectory,
    ReadFile,
    WriteFile,
    DeleteEntry,
    RenameEntry,
    ShareFile,
}

#[derive(Debug, Clone)]
enum Node {
    Directory { modified: DateTime<Utc> },
    File { text: String, modified: DateTime<Utc> },
}

pub struct MemoryStore {
    id: String,
    nodes: RwLock<BTreeMap<NotePath, Node>>,
    calls: Mutex<HashMap<StoreOp, usize>>,
    writes: Mutex<Vec<(NotePath, String)>>,
    failures: Mutex<HashMap<StoreOp, VecDeque<LockInError>>>,
    gates: Mutex<HashMap<StoreOp, Arc<Semaphore>>>,
    available: AtomicBool,
    share: Arc<dyn ShareTarget>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            id: "memory".to_string(),
            nodes: RwLock::new(BTreeMap::new()),
            calls: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            share: Arc::new(RecordingShareTarget::new()),
        }
    }

    pub fn with_share_target(mut self, share: Arc<dyn ShareTarget>) -> Self {
        self.share = share;
        self
    }

    /// Seeds a file, creating parent folders; bypasses counters and gates.
    pub fn insert_file(&self, path: impl Into<NotePath>, text: impl Into<String>) {
        let path = path.into();
        let now = Utc::now();
        let mut nodes = self.nodes.write();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.is_root() {
                break;
            }
            nodes.entry(dir.clone()).or_insert(Node::Directory { modified: now });
            parent = dir.parent();
        }
        nodes.insert(path, Node::File { text: text.into(), modified: now });
    }

    /// Seeds a folder and its parents; bypasses counters and gates.
    pub fn insert_directory(&self, path: impl Into<NotePath>) {
        let mut dir = Some(path.into());
        let now = Utc::now();
        let mut nodes = self.nodes.write();
        while let Some(d) = dir {
            if d.is_root() {
                break;
            }
            nodes.entry(d.clone()).or_insert(Node::Directory { modified: now });
            dir = d.parent();
        }
    }

    /// Current text of a file, without touching counters
    pub fn contents(&self, path: impl Into<NotePath>) -> Option<String> {
        match self.nodes.read().get(&path.into()) {
            Some(Node::File { text, .. }) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Every successful `write_file`, in completion order
    pub fn writes(&self) -> Vec<(NotePath, String)> {
        self.writes.lock().clone()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// The next call of `op` fails with `err`.
    pub fn fail_next(&self, op: StoreOp, err: LockInError) {
        self.failures.lock().entry(op).or_default().push_back(err);
    }

    /// Calls of `op` wait until [`step`](Self::step) or [`resume`](Self::resume).
    pub fn pause(&self, op: StoreOp) {
        self.gates.lock().insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Lets one waiting (or future) call of a paused `op` through.
    pub fn step(&self, op: StoreOp) {
        if let Some(gate) = self.gates.lock().get(&op) {
            gate.add_permits(1);
        }
    }

    /// Releases every waiting call of `op` and stops gating it.
    pub fn resume(&self, op: StoreOp) {
        if let Some(gate) = self.gates.lock().remove(&op) {
            gate.close();
        }
    }

    async fn enter(&self, op: StoreOp) -> LockInResult<()> {
        *self.calls.lock().entry(op).or_insert(0) += 1;

        let gate = self.gates.lock().get(&op).cloned();
        if let Some(gate) = gate {
            // A closed gate means the op was resumed.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if let Some(err) = self.failures.lock().get_mut(&op).and_then(VecDeque::pop_front) {
            debug!(?op, "Injected failure: {}", err);
            return Err(err);
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(LockInError::StoreUnavailable(self.id.clone()));
        }
        Ok(())
    }

    fn is_directory(nodes: &BTreeMap<NotePath, Node>, path: &NotePath) -> bool {
        path.is_root() || matches!(nodes.get(path), Some(Node::Directory { .. }))
    }

    fn to_entry(path: &NotePath, node: &Node) -> FileSystemEntry {
        match node {
            Node::Directory { modified } => FileSystemEntry::directory(path.clone()).with_modified(*modified),
            Node::File { text, modified } => FileSystemEntry::file(path.clone())
                .with_size(text.len() as u64)
                .with_modified(*modified),
        }
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    fn id(&self) -> &str {
        &self.id
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn list(&self, path: &NotePath) -> LockInResult<Vec<FileSystemEntry>> {
        self.enter(StoreOp::List).await?;
        let nodes = self.nodes.read();
        if !Self::is_directory(&nodes, path) {
            return Ok(Vec::new());
        }
        let mut entries: Vec<_> = nodes
            .iter()
            .filter(|(p, _)| p.parent().as_ref() == Some(path))
            .map(|(p, node)| Self::to_entry(p, node))
            .collect();
        sort_listing(&mut entries);
        Ok(entries)
    }

    async fn stat(&self, path: &NotePath) -> LockInResult<Option<FileSystemEntry>> {
        self.enter(StoreOp::Stat).await?;
        if path.is_root() {
            return Ok(Some(FileSystemEntry::directory(NotePath::root())));
        }
        Ok(self.nodes.read().get(path).map(|node| Self::to_entry(path, node)))
    }

    async fn create_directory(&self, path: &NotePath) -> LockInResult<()> {
        self.enter(StoreOp::CreateDirectory).await?;
        let mut nodes = self.nodes.write();

        let mut chain = Vec::new();
        let mut dir = Some(path.clone());
        while let Some(d) = dir {
            if d.is_root() {
                break;
            }
            if let Some(Node::File { .. }) = nodes.get(&d) {
                return Err(LockInError::Conflict(format!("{} exists and is not a folder", d)));
            }
            dir = d.parent();
            chain.push(d);
        }

        let now = Utc::now();
        for d in chain {
            nodes.entry(d).or_insert(Node::Directory { modified: now });
        }
        Ok(())
    }

    async fn read_file(&self, path: &NotePath) -> LockInResult<String> {
        self.enter(StoreOp::ReadFile).await?;
        match self.nodes.read().get(path) {
            Some(Node::File { text, .. }) => Ok(text.clone()),
            _ => Err(LockInError::NotFound(path.to_string())),
        }
    }

    async fn write_file(&self, path: &NotePath, text: &str) -> LockInResult<()> {
        self.enter(StoreOp::WriteFile).await?;
        if path.is_root() {
            return Err(LockInError::InvalidPath("cannot write to the root folder".into()));
        }
        {
            let mut nodes = self.nodes.write();
            let parent = path.parent().unwrap_or_default();
            if !Self::is_directory(&nodes, &parent) {
                return Err(LockInError::WriteError(format!("{}: parent folder does not exist", path)));
            }
            if let Some(Node::Directory { .. }) = nodes.get(path) {
                return Err(LockInError::WriteError(format!("{} is a folder", path)));
            }
            nodes.insert(path.clone(), Node::File { text: text.to_string(), modified: Utc::now() });
        }
        self.writes.lock().push((path.clone(), text.to_string()));
        Ok(())
    }

    async fn delete_entry(&self, path: &NotePath) -> LockInResult<()> {
        self.enter(StoreOp::DeleteEntry).await?;
        self.nodes.write().retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    async fn rename_entry(&self, from: &NotePath, to: &NotePath) -> LockInResult<()> {
        self.enter(StoreOp::RenameEntry).await?;
        if from == to {
            return Ok(());
        }
        if to.starts_with(from) {
            return Err(LockInError::Conflict(format!("cannot move {} into itself", from)));
        }

        let mut nodes = self.nodes.write();
        if !nodes.contains_key(from) {
            return Err(LockInError::NotFound(from.to_string()));
        }
        if nodes.contains_key(to) {
            return Err(LockInError::Conflict(format!("{} already exists", to)));
        }
        let target_parent = to.parent().unwrap_or_default();
        if !Self::is_directory(&nodes, &target_parent) {
            return Err(LockInError::NotFound(target_parent.to_string()));
        }

        let moved: Vec<NotePath> = nodes.keys().filter(|p| p.starts_with(from)).cloned().collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let suffix = &old.segments()[from.depth()..];
                let new = suffix.iter().fold(to.clone(), |acc, seg| acc.join(seg));
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn share_file(&self, path: &NotePath) -> LockInResult<()> {
        self.enter(StoreOp::ShareFile).await?;
        if !matches!(self.nodes.read().get(path), Some(Node::File { .. })) {
            return Err(LockInError::NotFound(path.to_string()));
        }
        self.share.share(ShareRequest::text(path.clone())).await
    }
}
