//! Configuration management for receipt-batch using the prefer crate.
//!
//! Every section implements `Default` with environment overrides already
//! applied, so a missing config file still yields a usable configuration.
//! Values read from a file are overridden by the environment again after
//! parsing.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bucket holding pending receipts and the job-tracking record.
pub const DEFAULT_BUCKET: &str = "catering-receipts";

/// Name of the secret (and the field inside it) holding the API key.
pub const DEFAULT_SECRET_NAME: &str = "OPENAI_API_KEY";

/// Extraction instruction sent alongside every receipt image.
pub const DEFAULT_PROMPT: &str = "You are a receipt processing specialist. For the attached image, \
extract the vendor name, the transaction date, and the total amount. Return the output as a JSON \
object with three keys: 'vendor', 'date', and 'total'.";

/// Look up an environment variable, treating empty values as unset.
fn env_value(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.is_empty())
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Where objects are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    /// A directory on local disk, one file per key.
    Local,
}

impl StorageBackend {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s3" => Some(StorageBackend::S3),
            "local" | "fs" | "file" => Some(StorageBackend::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    /// AWS region; falls back to the standard AWS environment when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    /// Root directory for the local backend.
    pub local_root: PathBuf,
}

impl StorageConfig {
    fn builtin() -> Self {
        // ~/.local/share/receipts, falling back to the home dir, then the CWD
        let local_root = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("receipts");

        Self {
            backend: StorageBackend::S3,
            bucket: DEFAULT_BUCKET.to_string(),
            region: None,
            endpoint_url: None,
            force_path_style: false,
            local_root,
        }
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(process_env)
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(backend) = env_value(&lookup, "RECEIPTS_STORAGE_BACKEND") {
            match StorageBackend::parse(&backend) {
                Some(b) => self.backend = b,
                None => tracing::warn!("Ignoring unknown storage backend: {}", backend),
            }
        }
        if let Some(bucket) = env_value(&lookup, "S3_BUCKET_NAME") {
            self.bucket = bucket;
        }
        if let Some(url) = env_value(&lookup, "S3_ENDPOINT_URL") {
            self.endpoint_url = Some(url);
            // S3-compatible servers rarely support virtual-hosted addressing
            self.force_path_style = true;
        }
        if let Some(root) = env_value(&lookup, "RECEIPTS_LOCAL_ROOT") {
            self.local_root = PathBuf::from(shellexpand::tilde(&root).as_ref());
        }
        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::builtin().with_env_overrides()
    }
}

/// Where the API credential is fetched from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretsBackend {
    /// AWS Secrets Manager.
    #[default]
    Aws,
    /// A process environment variable named after the secret.
    Env,
}

impl SecretsBackend {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "aws" | "secretsmanager" => Some(SecretsBackend::Aws),
            "env" | "environment" => Some(SecretsBackend::Env),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub backend: SecretsBackend,
    pub secret_name: String,
    /// Field of the JSON secret body holding the key.
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl SecretsConfig {
    fn builtin() -> Self {
        Self {
            backend: SecretsBackend::Aws,
            secret_name: DEFAULT_SECRET_NAME.to_string(),
            field: DEFAULT_SECRET_NAME.to_string(),
            region: None,
        }
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(process_env)
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(backend) = env_value(&lookup, "RECEIPTS_SECRETS_BACKEND") {
            match SecretsBackend::parse(&backend) {
                Some(b) => self.backend = b,
                None => tracing::warn!("Ignoring unknown secrets backend: {}", backend),
            }
        }
        if let Some(name) = env_value(&lookup, "RECEIPTS_SECRET_NAME") {
            self.secret_name = name;
        }
        self
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self::builtin().with_env_overrides()
    }
}

/// Batch packaging and submission settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Base URL of the OpenAI-compatible API, including `/v1`.
    pub api_base: String,
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    /// Endpoint each batch request line targets.
    pub endpoint: String,
    pub completion_window: String,
    pub pending_prefix: String,
    pub tracking_key: String,
    pub archive_prefix: String,
    /// Move packaged objects to `archive_prefix` after a successful submit.
    pub archive_submitted: bool,
    /// Directory for the JSONL staging file (system temp dir when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl BatchConfig {
    fn builtin() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_tokens: 500,
            endpoint: "/v1/chat/completions".to_string(),
            completion_window: "24h".to_string(),
            pending_prefix: "new/".to_string(),
            tracking_key: "job_tracking/latest_job.json".to_string(),
            archive_prefix: "submitted/".to_string(),
            archive_submitted: true,
            staging_dir: None,
            request_timeout_secs: 120,
        }
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(process_env)
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = env_value(&lookup, "OPENAI_BASE_URL") {
            self.api_base = base;
        }
        if let Some(model) = env_value(&lookup, "RECEIPTS_BATCH_MODEL") {
            self.model = model;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory the staging file is written into.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(env::temp_dir)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::builtin().with_env_overrides()
    }
}

/// Field extractor used by the `ocr` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    #[default]
    Tesseract,
    Vision,
}

impl std::str::FromStr for OcrBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tesseract" => Ok(OcrBackendKind::Tesseract),
            "vision" | "openai" => Ok(OcrBackendKind::Vision),
            other => Err(format!(
                "Unknown OCR backend '{}'. Available: tesseract, vision",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackendKind,
    /// Tesseract language code.
    pub language: String,
    /// Model for the vision extractor (defaults to `batch.model`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Tesseract,
            language: "eng".to_string(),
            vision_model: None,
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub secrets: SecretsConfig,
    pub batch: BatchConfig,
    pub ocr: OcrConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers receipts config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("receipts").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}; using defaults", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => {
                // No config file found, use defaults with env overrides
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;

        config.source_path = Some(path.to_path_buf());
        config.storage = config.storage.with_env_overrides();
        config.secrets = config.secrets.with_env_overrides();
        config.batch = config.batch.with_env_overrides();

        if let Some(base_dir) = config.base_dir() {
            config.resolve_paths(&base_dir);
        }
        Ok(config)
    }

    /// Parse config text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
        let raw = path.to_string_lossy();
        let expanded = shellexpand::tilde(raw.as_ref());
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Resolve every filesystem path in the config against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        self.storage.local_root = Self::resolve_path(&self.storage.local_root, base_dir);
        if let Some(ref dir) = self.batch.staging_dir {
            self.batch.staging_dir = Some(Self::resolve_path(dir, base_dir));
        }
    }

    /// Effective configuration as pretty JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Options for loading configuration.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load config with explicit options.
///
/// An explicit `--config` path that cannot be read or parsed is an error;
/// a discovered file that fails to parse falls back to defaults.
pub async fn load_config_with_options(options: LoadOptions) -> Result<Config, String> {
    match options.config_path {
        Some(ref path) => Config::load_from_path(path).await,
        None => Ok(Config::load().await),
    }
}
