//! reqwest client for the OpenAI files, batches and chat-completions APIs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::request::{ChatCompletionBody, ChatCompletionResponse, FileObject};
use super::{BatchApiError, BatchJob, BatchService, CreateBatchRequest};

/// Authenticated client for one API base URL (e.g. `https://api.openai.com/v1`).
pub struct OpenAiClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BatchApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BatchApiError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Turn a response into `T`, mapping non-2xx statuses to `BatchApiError::Api`.
    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, BatchApiError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BatchApiError::Api { status, body });
        }
        resp.json()
            .await
            .map_err(|e| BatchApiError::Parse(e.to_string()))
    }

    /// Run one chat completion and return the first choice's text.
    pub async fn chat_completion(&self, body: &ChatCompletionBody) -> Result<String, BatchApiError> {
        debug!("Requesting chat completion with model {}", body.model);
        let resp = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| BatchApiError::Connection(e.to_string()))?;

        let completion: ChatCompletionResponse = Self::read_json(resp).await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BatchApiError::Parse("Empty completion response".to_string()))
    }
}

#[async_trait]
impl BatchService for OpenAiClient {
    async fn upload_batch_file(&self, path: &Path) -> Result<String, BatchApiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("batch.jsonl")
            .to_string();
        debug!("Uploading batch input {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/jsonl")
            .map_err(|e| BatchApiError::Connection(e.to_string()))?;
        let form = Form::new().text("purpose", "batch").part("file", part);

        let resp = self
            .client
            .post(self.url("files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BatchApiError::Connection(e.to_string()))?;

        let file: FileObject = Self::read_json(resp).await?;
        info!("Uploaded batch input file: {}", file.id);
        Ok(file.id)
    }

    async fn create_batch(&self, request: &CreateBatchRequest) -> Result<BatchJob, BatchApiError> {
        let resp = self
            .client
            .post(self.url("batches"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| BatchApiError::Connection(e.to_string()))?;

        let job: BatchJob = Self::read_json(resp).await?;
        info!("Created batch job {} for file {}", job.id, request.input_file_id);
        Ok(job)
    }
}
