#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::prompt::PromptTemplate;

pub const CONFIG_DIR_NAME: &str = "pnd-assistant";
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Wire format spoken by a remote model service
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Ollama,
}

impl Provider {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    #[inline]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: Provider,
    /// Service root; the provider's public endpoint when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            base_url: None,
            model: "text-embedding-3-large".to_string(),
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: Provider,
    /// Service root; the provider's public endpoint when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the generator
    pub k: usize,
    /// Location of the LanceDB directory, relative paths resolve against the config directory
    pub index_path: PathBuf,
    pub table: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_TOP_K,
            index_path: PathBuf::from("vectordb"),
            table: "plan_chunks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    /// Replaces the built-in system instruction; must contain one `{context}` slot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_template: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name for {0} service (cannot be empty)")]
    InvalidModel(&'static str),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid top-k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid index table name (cannot be empty)")]
    InvalidTableName,
    #[error("Invalid system template: {0}")]
    InvalidTemplate(String),
    #[error("Missing API key for {0} service (set it in config.toml or via OPENAI_API_KEY)")]
    MissingApiKey(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load `config.toml` from `config_dir`, falling back to defaults when the file is absent
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config.validate()?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;

        fs::create_dir_all(self.get_base_dir())?;

        let content = toml::to_string_pretty(self)?;
        fs::write(self.config_file_path(), content)?;

        Ok(())
    }

    /// Platform config directory used when `--config-dir` is not given
    #[inline]
    pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Get the path of the persisted vector index
    #[inline]
    pub fn index_path(&self) -> PathBuf {
        if self.retrieval.index_path.is_absolute() {
            self.retrieval.index_path.clone()
        } else {
            self.get_base_dir().join(&self.retrieval.index_path)
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.generation.validate()?;
        self.retrieval.validate()?;
        self.prompt.template()?;
        Ok(())
    }

    /// Fail early when a service that needs credentials has none
    #[inline]
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        self.embedding.resolve_api_key()?;
        self.generation.resolve_api_key()?;
        Ok(())
    }
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service_url()?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("embedding"));
        }
        validate_timeout(self.timeout_seconds)
    }

    /// Configured service root, falling back to the provider default
    #[inline]
    pub fn base_url(&self) -> &str {
        effective_base_url(self.provider, self.base_url.as_deref())
    }

    #[inline]
    pub fn service_url(&self) -> Result<Url, ConfigError> {
        validate_service_url(self.base_url())
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[inline]
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        resolve_api_key(self.provider, self.api_key.as_deref(), "embedding")
    }
}

impl GenerationConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service_url()?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("generation"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        validate_timeout(self.timeout_seconds)
    }

    /// Configured service root, falling back to the provider default
    #[inline]
    pub fn base_url(&self) -> &str {
        effective_base_url(self.provider, self.base_url.as_deref())
    }

    #[inline]
    pub fn service_url(&self) -> Result<Url, ConfigError> {
        validate_service_url(self.base_url())
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[inline]
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        resolve_api_key(self.provider, self.api_key.as_deref(), "generation")
    }

    #[inline]
    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }
        self.temperature = temperature;
        Ok(())
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.k) {
            return Err(ConfigError::InvalidTopK(self.k));
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::InvalidTableName);
        }
        Ok(())
    }

    #[inline]
    pub fn set_k(&mut self, k: usize) -> Result<(), ConfigError> {
        if !(1..=50).contains(&k) {
            return Err(ConfigError::InvalidTopK(k));
        }
        self.k = k;
        Ok(())
    }
}

impl PromptConfig {
    /// Build the system prompt template, using the built-in one unless overridden
    #[inline]
    pub fn template(&self) -> Result<PromptTemplate, ConfigError> {
        self.system_template
            .as_deref()
            .map_or_else(|| Ok(PromptTemplate::default()), PromptTemplate::new)
    }
}

fn effective_base_url(provider: Provider, configured: Option<&str>) -> &str {
    configured
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| provider.default_base_url())
}

fn validate_service_url(base_url: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(base_url).map_err(|_| ConfigError::InvalidUrl(base_url.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
    }
    Ok(url)
}

fn validate_timeout(timeout_seconds: u64) -> Result<(), ConfigError> {
    if !(1..=600).contains(&timeout_seconds) {
        return Err(ConfigError::InvalidTimeout(timeout_seconds));
    }
    Ok(())
}

fn resolve_api_key(
    provider: Provider,
    configured: Option<&str>,
    service: &'static str,
) -> Result<Option<String>, ConfigError> {
    if let Some(key) = configured.filter(|key| !key.trim().is_empty()) {
        return Ok(Some(key.to_string()));
    }

    let from_env = std::env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty());

    match provider {
        Provider::OpenAi => from_env.map(Some).ok_or(ConfigError::MissingApiKey(service)),
        // Local Ollama servers run without authentication
        Provider::Ollama => Ok(None),
    }
}
