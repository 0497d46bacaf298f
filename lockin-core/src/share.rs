// SPDX-License-Identifier: AGPL-3.0-or-later
//! Platform share/export hand-off

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{error::LockInResult, NotePath};

pub const TEXT_MIME_TYPE: &str = "text/plain";
pub const TEXT_UTI: &str = "public.plain-text";

/// What gets handed to the share sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRequest {
    pub path: NotePath,
    /// Absolute location on disk, when the store has one
    pub location: Option<PathBuf>,
    pub mime_type: String,
    pub uti: String,
}

impl ShareRequest {
    pub fn text(path: NotePath) -> Self {
        Self {
            path,
            location: None,
            mime_type: TEXT_MIME_TYPE.to_string(),
            uti: TEXT_UTI.to_string(),
        }
    }

    pub fn with_location(mut self, location: PathBuf) -> Self {
        self.location = Some(location);
        self
    }
}

#[async_trait]
pub trait ShareTarget: Send + Sync {
    async fn share(&self, request: ShareRequest) -> LockInResult<()>;
}
