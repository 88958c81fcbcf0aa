//! Tesseract OCR extractor.
//!
//! Uses Tesseract via command-line and returns the recognised text.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::backend::{ExtractedFields, FieldExtractor, OcrError};
use super::model_utils::check_binary;

pub struct TesseractExtractor {
    binary: String,
    language: String,
}

impl TesseractExtractor {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: language.into(),
        }
    }

    /// Use a different executable name or path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn run_tesseract(&self, image_path: &std::path::Path) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.binary
                )))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[async_trait]
impl FieldExtractor for TesseractExtractor {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary(&self.binary)
    }

    async fn extract_fields(&self, image: &[u8]) -> Result<ExtractedFields, OcrError> {
        // tesseract reads from a path, so stage the bytes
        let staged = tempfile::Builder::new().prefix("receipt_").tempfile()?;
        tokio::fs::write(staged.path(), image).await?;
        debug!("Running tesseract on {} bytes", image.len());
        let text = self.run_tesseract(staged.path()).await?;
        Ok(ExtractedFields::Text(text))
    }

    async fn extract_file(&self, path: &std::path::Path) -> Result<ExtractedFields, OcrError> {
        let text = self.run_tesseract(path).await?;
        Ok(ExtractedFields::Text(text))
    }
}
