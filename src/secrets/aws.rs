//! AWS Secrets Manager backed secret store.

use async_trait::async_trait;
use aws_sdk_secretsmanager::config::Region;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;

use super::{SecretError, SecretStore};

pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard AWS environment.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let shared = loader.load().await;
        Self::new(Client::new(&shared))
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        tracing::debug!("Fetching secret {} from Secrets Manager", name);
        let resp = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| SecretError::Lookup {
                name: name.to_string(),
                message: DisplayErrorContext(e).to_string(),
            })?;

        resp.secret_string
            .ok_or_else(|| SecretError::NoStringValue(name.to_string()))
    }
}
