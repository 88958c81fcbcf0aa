//! Field extractor abstraction.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::inference::BatchApiError;

/// Errors from field extractors.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Not a supported image: {0}")]
    UnsupportedImage(String),

    #[error("Inference request failed: {0}")]
    Api(#[from] BatchApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What an extractor produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedFields {
    /// Parsed JSON, e.g. `{"vendor": ..., "date": ..., "total": ...}`.
    Structured(serde_json::Value),
    /// Raw recognised text.
    Text(String),
}

impl ExtractedFields {
    /// Heading printed above the result.
    pub fn heading(&self) -> &'static str {
        match self {
            ExtractedFields::Structured(_) => "--- OCR Result (JSON) ---",
            ExtractedFields::Text(_) => "--- OCR Result ---",
        }
    }
}

impl fmt::Display for ExtractedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractedFields::Structured(value) => {
                let pretty = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                f.write_str(&pretty)
            }
            ExtractedFields::Text(text) => f.write_str(text.trim_end()),
        }
    }
}

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check if this extractor can run (binary installed, credential present).
    fn is_available(&self) -> bool;

    async fn extract_fields(&self, image: &[u8]) -> Result<ExtractedFields, OcrError>;

    async fn extract_file(&self, path: &Path) -> Result<ExtractedFields, OcrError> {
        let bytes = tokio::fs::read(path).await?;
        self.extract_fields(&bytes).await
    }
}
