//! Client side of the OpenAI-compatible inference service.
//!
//! The batch workflow only needs two calls (upload an input file, create a
//! batch), captured by [`BatchService`] so tests can substitute a recorder.

mod openai;
mod request;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiClient;
pub use request::{
    BatchJob, BatchRequestLine, ChatCompletionBody, ChatMessage, ContentPart, CreateBatchRequest,
    ImageUrl, ResponseFormat,
};

/// Errors that can occur talking to the inference service.
#[derive(Debug, Error)]
pub enum BatchApiError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BatchService: Send + Sync {
    /// Upload a JSONL input file with `purpose=batch`, returning its file id.
    async fn upload_batch_file(&self, path: &Path) -> Result<String, BatchApiError>;

    /// Start asynchronous execution of an uploaded input file.
    async fn create_batch(&self, request: &CreateBatchRequest) -> Result<BatchJob, BatchApiError>;
}

/// Builds an authenticated [`BatchService`] once the credential is known.
pub trait BatchConnector: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn BatchService>, BatchApiError>;
}

/// Connects to an OpenAI-compatible API at a fixed base URL.
#[derive(Debug, Clone)]
pub struct OpenAiConnector {
    api_base: String,
    timeout: Duration,
}

impl OpenAiConnector {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base: api_base.into(),
            timeout,
        }
    }
}

impl BatchConnector for OpenAiConnector {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn BatchService>, BatchApiError> {
        let client = OpenAiClient::new(api_key, self.api_base.clone(), self.timeout)?;
        Ok(Arc::new(client))
    }
}
