//! Environment-variable secret store for local runs.

use async_trait::async_trait;

use super::{SecretError, SecretStore};

/// Reads secret `name` from the environment variable of the same name.
///
/// A plain value is presented as `{"<name>": "<value>"}` so it parses the
/// same way as a Secrets Manager entry; a value that already is a JSON
/// object is returned unchanged.
#[derive(Debug, Default, Clone)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    fn wrap(name: &str, value: String) -> String {
        if value.trim_start().starts_with('{') {
            value
        } else {
            let mut object = serde_json::Map::new();
            object.insert(name.to_string(), serde_json::Value::String(value));
            serde_json::Value::Object(object).to_string()
        }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        let value = std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SecretError::Lookup {
                name: name.to_string(),
                message: format!("environment variable {} is not set", name),
            })?;
        Ok(Self::wrap(name, value))
    }
}
