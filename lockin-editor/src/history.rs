// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bounded linear undo/redo history

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), timestamp: Utc::now() }
    }
}

/// Snapshots with a cursor. Committing while the cursor is behind the tail
/// drops everything after it; once `limit` is exceeded the oldest snapshots
/// fall off the front.
#[derive(Debug, Clone)]
pub struct EditHistory {
    entries: VecDeque<Snapshot>,
    index: usize,
    limit: usize,
}

impl EditHistory {
    pub fn new(limit: usize) -> Self {
        Self { entries: VecDeque::new(), index: 0, limit: limit.max(1) }
    }

    pub fn with_initial(limit: usize, content: impl Into<String>) -> Self {
        let mut history = Self::new(limit);
        history.reset(content);
        history
    }

    /// Replaces everything with a single snapshot.
    pub fn reset(&mut self, content: impl Into<String>) {
        self.entries.clear();
        self.entries.push_back(Snapshot::new(content));
        self.index = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }

    pub fn commit(&mut self, content: impl Into<String>) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push_back(Snapshot::new(content));
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Steps back and returns the snapshot content now under the cursor.
    pub fn undo(&mut self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.current()
    }

    pub fn redo(&mut self) -> Option<&str> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.current()
    }

    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.index).map(|s| s.content.as_str())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contents(&self) -> Vec<String> {
        self.entries.iter().map(|s| s.content.clone()).collect()
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_has_single_entry() {
        let history = EditHistory::with_initial(50, "A");
        assert_eq!(history.len(), 1);
        assert_eq!(history.index(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.current(), Some("A"));
    }

    #[test]
    fn test_undo_redo_walks_cursor() {
        let mut history = EditHistory::with_initial(50, "A");
        history.commit("B");
        history.commit("C");

        assert_eq!(history.undo(), Some("B"));
        assert_eq!(history.undo(), Some("A"));
        assert_eq!(history.undo(), None);
        assert_eq!(history.index(), 0);

        assert_eq!(history.redo(), Some("B"));
        assert_eq!(history.redo(), Some("C"));
        assert_eq!(history.redo(), None);
        assert_eq!(history.index(), 2);
    }

    #[test]
    fn test_commit_after_undo_drops_forward_entries() {
        let mut history = EditHistory::with_initial(50, "A");
        history.commit("B");
        history.commit("C");
        history.undo();
        history.commit("D");

        assert_eq!(history.contents(), ["A", "B", "D"]);
        assert!(!history.can_redo());
        assert_eq!(history.index(), 2);
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let mut history = EditHistory::with_initial(50, "0");
        for i in 1..=60 {
            history.commit(i.to_string());
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.index(), 49);
        let expected: Vec<String> = (11..=60).map(|i| i.to_string()).collect();
        assert_eq!(history.contents(), expected);
    }

    #[test]
    fn test_commit_into_empty_history() {
        let mut history = EditHistory::new(3);
        assert!(history.is_empty());
        assert!(!history.can_redo());
        history.commit("x");
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some("x"));
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let mut history = EditHistory::new(0);
        history.commit("a");
        history.commit("b");
        assert_eq!(history.contents(), ["b"]);
    }
}
