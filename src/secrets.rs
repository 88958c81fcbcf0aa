//! Secret retrieval for the inference service credential.
//!
//! A secret is a JSON object (`{"OPENAI_API_KEY": "sk-..."}`). The store
//! returns the raw string; [`fetch_secret_field`] parses it and picks one
//! field.

mod aws;
mod env;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{SecretsBackend, SecretsConfig};

pub use aws::AwsSecretStore;
pub use env::EnvSecretStore;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret lookup for {name} failed: {message}")]
    Lookup { name: String, message: String },

    #[error("Secret {0} has no string value")]
    NoStringValue(String),

    #[error("Secret {name} is not a JSON object: {message}")]
    Parse { name: String, message: String },

    #[error("Secret field {0} is missing or not a string")]
    MissingField(String),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the raw secret string stored under `name`.
    async fn get_secret(&self, name: &str) -> Result<String, SecretError>;
}

/// Fetch secret `name` and return the string value of `field`.
pub async fn fetch_secret_field(
    store: &dyn SecretStore,
    name: &str,
    field: &str,
) -> Result<String, SecretError> {
    let raw = store.get_secret(name).await?;
    parse_secret_field(name, &raw, field)
}

/// Pick `field` out of a JSON-object secret body.
pub fn parse_secret_field(name: &str, raw: &str, field: &str) -> Result<String, SecretError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| SecretError::Parse {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    let object = value.as_object().ok_or_else(|| SecretError::Parse {
        name: name.to_string(),
        message: "expected a JSON object".to_string(),
    })?;
    object
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| SecretError::MissingField(field.to_string()))
}

/// Build the configured secret store.
pub async fn build_secret_store(config: &SecretsConfig) -> Arc<dyn SecretStore> {
    match config.backend {
        SecretsBackend::Aws => Arc::new(AwsSecretStore::from_env(config.region.clone()).await),
        SecretsBackend::Env => Arc::new(EnvSecretStore::new()),
    }
}
