/// Centralized error types for the ingestion pipeline
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    // Source Errors
    #[error("Source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Row {line} skipped: {reason}")]
    ParseSkip { line: u64, reason: String },

    // Store Errors
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Cursor fallback: {0}")]
    CursorFallback(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors the run absorbs locally and keeps going after
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable { .. }
                | PipelineError::ParseSkip { .. }
                | PipelineError::PersistenceFailure(_)
                | PipelineError::CursorFallback(_)
        )
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            PipelineError::SourceUnavailable { .. } => "SRC_001",
            PipelineError::ParseSkip { .. } => "SRC_002",
            PipelineError::PersistenceFailure(_) => "DB_001",
            PipelineError::CursorFallback(_) => "DB_002",
            PipelineError::Database(_) => "DB_003",
            PipelineError::ConfigError(_) => "CFG_001",
            PipelineError::FileError(_) => "FILE_001",
            PipelineError::SerializationError(_) => "FILE_002",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(PipelineError::source_unavailable("a.gz", "gone").is_recoverable());
        assert!(PipelineError::PersistenceFailure("locked".into()).is_recoverable());
        assert!(!PipelineError::ConfigError("bad".into()).is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        let err = PipelineError::ParseSkip { line: 3, reason: "4 fields".into() };
        assert_eq!(err.error_code(), "SRC_002");
        assert_eq!(err.to_string(), "Row 3 skipped: 4 fields");
    }
}
