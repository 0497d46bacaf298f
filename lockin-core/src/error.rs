// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for LockIn

use thiserror::Error;

/// Result type alias
pub type LockInResult<T> = Result<T, LockInError>;

/// Main error type
#[derive(Error, Debug)]
pub enum LockInError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteError(String),

    #[error("Invalid name: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Preferences error: {0}")]
    Preferences(String),

    #[error("Share failed: {0}")]
    Share(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("File not loaded: {0}")]
    NotLoaded(String),
}

impl LockInError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LockInError::WriteError(_)
                | LockInError::StoreUnavailable(_)
                | LockInError::Io(_)
                | LockInError::Share(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            LockInError::NotFound(_) => true,
            LockInError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for LockInError {
    fn from(err: serde_json::Error) -> Self {
        LockInError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LockInError {
    fn from(err: toml::de::Error) -> Self {
        LockInError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(LockInError::WriteError("disk full".into()).is_retryable());
        assert!(LockInError::StoreUnavailable("no permission".into()).is_retryable());
        assert!(LockInError::Share("no handler".into()).is_retryable());

        assert!(!LockInError::NotFound("note.txt".into()).is_retryable());
        assert!(!LockInError::Validation("empty".into()).is_retryable());
        assert!(!LockInError::Conflict("exists".into()).is_retryable());
        assert!(!LockInError::SessionClosed.is_retryable());
    }

    #[test]
    fn test_is_not_found() {
        assert!(LockInError::NotFound("a.txt".into()).is_not_found());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(LockInError::from(io).is_not_found());
        assert!(!LockInError::Conflict("b".into()).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = LockInError::NotFound("Notes/todo.txt".into());
        assert_eq!(format!("{}", err), "Path not found: Notes/todo.txt");

        let err = LockInError::Validation("Name cannot be empty".into());
        assert!(format!("{}", err).contains("cannot be empty"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: LockInError = io_err.into();
        assert!(matches!(err, LockInError::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: LockInError = json_err.into();
        assert!(matches!(err, LockInError::Serialization(_)));
    }
}
