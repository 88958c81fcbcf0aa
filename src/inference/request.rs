//! Wire types for the OpenAI-compatible batch and chat-completions APIs.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::BatchConfig;
use crate::utils::detect_image_mime;

/// One line of a batch input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestLine {
    /// Correlation id; results come back keyed by it.
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: ChatCompletionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

impl ChatCompletionBody {
    /// Single user message carrying the extraction prompt and one image.
    pub fn receipt_extraction(image: &[u8], config: &BatchConfig) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let data_url = format!("data:{};base64,{}", detect_image_mime(image), encoded);

        Self {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: config.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: config.max_tokens,
            response_format: ResponseFormat::json_object(),
        }
    }

    /// The `data:` URL of the first embedded image, if any.
    pub fn image_data_url(&self) -> Option<&str> {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .find_map(|part| match part {
                ContentPart::ImageUrl { image_url } => Some(image_url.url.as_str()),
                ContentPart::Text { .. } => None,
            })
    }
}

impl BatchRequestLine {
    pub fn for_receipt(custom_id: impl Into<String>, image: &[u8], config: &BatchConfig) -> Self {
        Self {
            custom_id: custom_id.into(),
            method: "POST".to_string(),
            url: config.endpoint.clone(),
            body: ChatCompletionBody::receipt_extraction(image, config),
        }
    }

    /// Decode the embedded image back into bytes.
    pub fn decode_image(&self) -> Option<Vec<u8>> {
        let url = self.body.image_data_url()?;
        let (_, payload) = url.split_once(";base64,")?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()
    }
}

/// Body of `POST /batches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub input_file_id: String,
    pub endpoint: String,
    pub completion_window: String,
}

/// Batch object returned by the provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchJob {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// File object returned by `POST /files`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FileObject {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}
