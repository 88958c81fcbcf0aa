//! Failure categories shared by the intake and batch workflows.
//!
//! Every seam has its own error enum (`StorageError`, `SecretError`,
//! `BatchApiError`); `PipelineError` folds them into one closed set so the
//! invoker can decide between aborting and re-running.

use thiserror::Error;

use crate::inference::BatchApiError;
use crate::secrets::SecretError;
use crate::storage::StorageError;

/// Input problems detected before any side effect happens.
///
/// The display strings are the messages shown to the person filling in the
/// upload form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Error: Please provide both an Event Name and Event Date.")]
    MissingEventDetails,

    #[error("Error: No files uploaded.")]
    NoFiles,

    #[error("Error: Invalid date format. Please use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Error: File {index} ({name}) is not a supported image.")]
    NotAnImage { index: usize, name: String },

    #[error("Error: File {index} ({name}) could not be read: {message}")]
    UnreadableFile {
        index: usize,
        name: String,
        message: String,
    },
}

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad user input; nothing was written.
    Validation,
    /// Missing or invalid settings; aborted before any I/O.
    Configuration,
    /// A single storage read or write failed.
    TransientIo,
    /// Secret lookup or the inference service failed.
    ExternalService,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::TransientIo => "transient-io",
            ErrorCategory::ExternalService => "external-service",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Intake write failure. `written` lists the keys stored before it.
    #[error("Error uploading file {index}: {source}")]
    Upload {
        index: usize,
        key: String,
        written: Vec<String>,
        #[source]
        source: StorageError,
    },

    #[error("Storage error on {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Staging file error: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Secret lookup failed: {0}")]
    Secret(#[from] SecretError),

    #[error("Batch submission failed: {0}")]
    Batch(#[from] BatchApiError),
}

impl PipelineError {
    /// Wrap a storage failure with the key it happened on.
    pub fn storage(key: impl Into<String>, source: StorageError) -> Self {
        PipelineError::Storage {
            key: key.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Validation(_) => ErrorCategory::Validation,
            PipelineError::Configuration(_) => ErrorCategory::Configuration,
            PipelineError::Upload { .. }
            | PipelineError::Storage { .. }
            | PipelineError::Staging(_) => ErrorCategory::TransientIo,
            PipelineError::Secret(_) | PipelineError::Batch(_) => ErrorCategory::ExternalService,
        }
    }

    /// Whether re-running the same invocation could succeed.
    ///
    /// Validation and configuration failures need a human to change
    /// something first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::TransientIo | ErrorCategory::ExternalService
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::MissingEventDetails.to_string(),
            "Error: Please provide both an Event Name and Event Date."
        );
        assert_eq!(ValidationError::NoFiles.to_string(), "Error: No files uploaded.");
        assert_eq!(
            ValidationError::InvalidDate("07/04/2024".into()).to_string(),
            "Error: Invalid date format. Please use YYYY-MM-DD."
        );
    }

    #[test]
    fn test_categories() {
        let err = PipelineError::from(ValidationError::NoFiles);
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(!err.is_retryable());

        let err = PipelineError::Configuration("bucket is empty".into());
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_retryable());

        let err = PipelineError::storage("new/a.png", StorageError::NotFound("new/a.png".into()));
        assert_eq!(err.category(), ErrorCategory::TransientIo);
        assert!(err.is_retryable());

        let err = PipelineError::from(SecretError::MissingField("OPENAI_API_KEY".into()));
        assert_eq!(err.category(), ErrorCategory::ExternalService);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_upload_error_names_file() {
        let err = PipelineError::Upload {
            index: 2,
            key: "new/240704-bbq-2.png".into(),
            written: vec!["new/240704-bbq-1.png".into()],
            source: StorageError::Backend("access denied".into()),
        };
        assert!(err.to_string().starts_with("Error uploading file 2:"));
    }
}
