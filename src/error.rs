//! Centralized error types for repolens using thiserror
//!
//! Most failures in this crate are deliberately non-fatal: a file that does
//! not parse yields zero chunks, a git query that fails yields an empty
//! result. The types here cover the hard failures that do surface to callers.

use thiserror::Error;

/// Main error type for repository analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Dependency analysis error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to dependency graph construction
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("Project root does not exist: {0}")]
    RootNotFound(String),

    #[error("Project root is not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to export analysis to '{path}': {reason}")]
    ExportFailed { path: String, reason: String },
}

/// Errors related to git metadata extraction
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    RepoNotFound(String),
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        AnalysisError::Other(format!("{:#}", err))
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, AnalysisError>;
