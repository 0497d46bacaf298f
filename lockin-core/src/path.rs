// SPDX-License-Identifier: AGPL-3.0-or-later
//! Paths relative to the logical LockIn root

use serde::{Deserialize, Serialize};
use std::fmt;

/// Slash-separated location of a file or folder below the LockIn root.
///
/// The empty path is the root itself. `..` never climbs above the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NotePath {
    segments: Vec<String>,
}

impl NotePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self::root().join(path)
    }

    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn join(&self, name: impl AsRef<str>) -> Self {
        let mut segments = self.segments.clone();
        for part in name.as_ref().split('/').filter(|s| !s.is_empty()) {
            if part == ".." {
                segments.pop();
            } else if part != "." {
                segments.push(part.to_string());
            }
        }
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.name()
            .and_then(|n| n.rsplit_once('.'))
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext)
    }

    /// File name without its last extension
    pub fn stem(&self) -> Option<&str> {
        let name = self.name()?;
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => Some(stem),
            _ => Some(name),
        }
    }

    /// Sibling path with `name` in place of the last segment
    pub fn with_name(&self, name: impl AsRef<str>) -> Self {
        match self.parent() {
            Some(parent) => parent.join(name),
            None => Self::new(name),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn starts_with(&self, base: &NotePath) -> bool {
        self.segments.starts_with(&base.segments)
    }

    pub fn as_string(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for NotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

impl From<&str> for NotePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for NotePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<NotePath> for String {
    fn from(path: NotePath) -> Self {
        path.as_string()
    }
}
