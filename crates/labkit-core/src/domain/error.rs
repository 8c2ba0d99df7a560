// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (they travel inside reports)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Path escapes the target root: {path}")]
    PathEscapesRoot { path: String },

    #[error("Duplicate artifact path in catalog: {path}")]
    DuplicateArtifact { path: String },

    #[error("Duplicate mirror destination: {dest}")]
    DuplicateMirrorDestination { dest: String },

    #[error("Invalid mirror pair '{source_name}' -> '{dest_name}': {reason}")]
    InvalidMirrorPair {
        source_name: String,
        dest_name: String,
        reason: String,
    },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::AbsolutePathNotAllowed { path } | Self::PathEscapesRoot { path } => vec![
                format!("'{}' must stay inside the target directory", path),
                "Use a path relative to the target root".into(),
            ],
            Self::DuplicateArtifact { path } => vec![
                format!("The catalog declares '{}' twice", path),
                "This is a packaging bug, please report it".into(),
            ],
            Self::DuplicateMirrorDestination { .. } | Self::InvalidMirrorPair { .. } => {
                vec!["See documentation for more details".into()]
            }
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AbsolutePathNotAllowed { .. }
            | Self::PathEscapesRoot { .. }
            | Self::InvalidMirrorPair { .. } => ErrorCategory::Validation,
            Self::DuplicateArtifact { .. } | Self::DuplicateMirrorDestination { .. } => {
                ErrorCategory::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Internal,
}
