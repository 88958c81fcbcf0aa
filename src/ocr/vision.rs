//! Vision-model extractor using the chat-completions API.
//!
//! Sends the same extraction prompt the batch job uses, one image at a time,
//! and expects a JSON object back.

use async_trait::async_trait;
use tracing::debug;

use super::backend::{ExtractedFields, FieldExtractor, OcrError};
use crate::config::BatchConfig;
use crate::inference::{ChatCompletionBody, OpenAiClient};
use crate::utils::is_image;

pub struct VisionExtractor {
    client: OpenAiClient,
    config: BatchConfig,
}

impl VisionExtractor {
    /// `model` overrides `config.model` when set.
    pub fn new(client: OpenAiClient, mut config: BatchConfig, model: Option<String>) -> Self {
        if let Some(model) = model {
            config.model = model;
        }
        Self { client, config }
    }
}

#[async_trait]
impl FieldExtractor for VisionExtractor {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn extract_fields(&self, image: &[u8]) -> Result<ExtractedFields, OcrError> {
        if !is_image(image) {
            return Err(OcrError::UnsupportedImage(format!(
                "{} bytes of unrecognised content",
                image.len()
            )));
        }

        let body = ChatCompletionBody::receipt_extraction(image, &self.config);
        debug!("Requesting field extraction from {}", self.config.model);
        let content = self.client.chat_completion(&body).await?;

        let value: serde_json::Value = serde_json::from_str(content.trim()).map_err(|e| {
            OcrError::OcrFailed(format!("model returned non-JSON output: {}", e))
        })?;
        Ok(ExtractedFields::Structured(value))
    }
}
