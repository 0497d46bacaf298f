// SPDX-License-Identifier: AGPL-3.0-or-later
//! Share targets
//!
//! Desktop builds have no share sheet; sharing either logs the hand-off or
//! spawns an external program with the file's location.

use async_trait::async_trait;
use lockin_core::{
    error::{LockInError, LockInResult},
    ShareRequest, ShareTarget,
};
use parking_lot::Mutex;
use tokio::process::Command;
use tracing::info;

/// Logs the request and succeeds
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingShareTarget;

#[async_trait]
impl ShareTarget for LoggingShareTarget {
    async fn share(&self, request: ShareRequest) -> LockInResult<()> {
        info!(
            path = %request.path,
            mime = %request.mime_type,
            location = ?request.location,
            "Share requested"
        );
        Ok(())
    }
}

/// Runs `program [args..] <location>` for each request
#[derive(Debug, Clone)]
pub struct CommandShareTarget {
    program: String,
    args: Vec<String>,
}

impl CommandShareTarget {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[async_trait]
impl ShareTarget for CommandShareTarget {
    async fn share(&self, request: ShareRequest) -> LockInResult<()> {
        let location = request
            .location
            .ok_or_else(|| LockInError::Share(format!("{} has no location on disk", request.path)))?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&location)
            .output()
            .await
            .map_err(|e| LockInError::Share(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(LockInError::Share(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        info!(program = %self.program, path = %request.path, "Shared file");
        Ok(())
    }
}

/// Keeps every request; used by tests and previews
#[derive(Debug, Default)]
pub struct RecordingShareTarget {
    requests: Mutex<Vec<ShareRequest>>,
}

impl RecordingShareTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ShareRequest> {
        self.requests.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }
}

#[async_trait]
impl ShareTarget for RecordingShareTarget {
    async fn share(&self, request: ShareRequest) -> LockInResult<()> {
        self.requests.lock().push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockin_core::NotePath;

    #[tokio::test]
    async fn test_recording_target() {
        let target = RecordingShareTarget::new();
        assert!(target.is_empty());
        target.share(ShareRequest::text(NotePath::new("a.txt"))).await.unwrap();
        let requests = target.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mime_type, "text/plain");
        assert_eq!(requests[0].uti, "public.plain-text");
    }

    #[tokio::test]
    async fn test_command_target_requires_location() {
        let target = CommandShareTarget::new("true");
        let err = target
            .share(ShareRequest::text(NotePath::new("a.txt")))
            .await
            .unwrap_err();
        assert!(matches!(err, LockInError::Share(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_target_reports_failure() {
        let target = CommandShareTarget::new("false");
        let request = ShareRequest::text(NotePath::new("a.txt")).with_location("/tmp/a.txt".into());
        assert!(target.share(request).await.is_err());

        let target = CommandShareTarget::new("true");
        let request = ShareRequest::text(NotePath::new("a.txt")).with_location("/tmp/a.txt".into());
        assert!(target.share(request).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_target_passes_location_after_args() {
        let target = CommandShareTarget::new("sh")
            .arg("-c")
            .arg(r#"test "$0" = /tmp/a.txt"#);
        let request = ShareRequest::text(NotePath::new("a.txt")).with_location("/tmp/a.txt".into());
        assert!(target.share(request).await.is_ok());

        let request = ShareRequest::text(NotePath::new("b.txt")).with_location("/tmp/b.txt".into());
        assert!(target.share(request).await.is_err());
    }
}
