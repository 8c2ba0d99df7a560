//! Application layer errors.
//!
//! These errors represent failures in orchestration, not invariant
//! violations. Those are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// The target root exists but is not a directory.
    #[error("Target is not a directory: {path}")]
    TargetNotDirectory { path: PathBuf },

    /// In-memory adapter lock poisoned.
    #[error("Filesystem adapter lock poisoned")]
    StoreLockError,
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
                "Check available disk space".into(),
            ],
            Self::TargetNotDirectory { path } => vec![
                format!("'{}' exists and is a file", path.display()),
                "Pass a directory as the target".into(),
            ],
            Self::StoreLockError => vec!["Internal lock poisoned; try again".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FilesystemError { .. } | Self::StoreLockError => ErrorCategory::Internal,
            Self::TargetNotDirectory { .. } => ErrorCategory::Validation,
        }
    }
}
