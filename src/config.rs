use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::chunking::ChunkerConfig;
use crate::providers::ollama::DEFAULT_OLLAMA_URL;

/// Service configuration, read from TOML and overridden by environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upload cap for the ingest endpoint
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => bail!("Unknown provider '{}' (expected ollama or openai)", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub embedding_dimension: usize,
    pub timeout_secs: u64,
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl ProvidersConfig {
    pub fn ollama() -> Self {
        Self {
            kind: ProviderKind::Ollama,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            chat_model: "qwen2.5:7b-instruct".to_string(),
            embedding_dimension: 768,
            timeout_secs: 60,
            api_key: None,
        }
    }

    pub fn openai() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-4".to_string(),
            embedding_dimension: 1536,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self::ollama()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Qdrant,
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => bail!("Unknown store '{}' (expected qdrant or memory)", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub url: String,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Qdrant,
            url: "http://localhost:6334".to_string(),
            collection: "passages".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Chunks embedded and stored at once; 1 keeps strict chunk order
    pub concurrency: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub property_name: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            property_name: "Oasis Hotel".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// The default file is created with default values if it doesn't exist.
    /// Environment overrides (including a `.env` file) are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::read_from(path)?,
            None => {
                let config_path = Self::config_path()?;
                if config_path.exists() {
                    Self::read_from(&config_path)?
                } else {
                    let config = Config::default();
                    config.save_to(&config_path)?;
                    config
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path, self.to_toml()?).context("Failed to write config file")?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".concierge").join("config.toml"))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = get("CONCIERGE_PROVIDER") {
            let kind: ProviderKind = kind.parse()?;
            if kind != self.providers.kind {
                // Switching provider resets models and dimension to that provider's defaults
                let timeout_secs = self.providers.timeout_secs;
                self.providers = match kind {
                    ProviderKind::Ollama => ProvidersConfig::ollama(),
                    ProviderKind::OpenAi => ProvidersConfig::openai(),
                };
                self.providers.timeout_secs = timeout_secs;
            }
        }
        match self.providers.kind {
            ProviderKind::Ollama => {
                if let Some(url) = get("OLLAMA_URL") {
                    self.providers.base_url = url;
                }
            }
            ProviderKind::OpenAi => {
                if let Some(url) = get("OPENAI_BASE_URL") {
                    self.providers.base_url = url;
                }
            }
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.providers.api_key = Some(key);
        }
        if let Some(kind) = get("CONCIERGE_STORE") {
            self.store.kind = kind.parse()?;
        }
        if let Some(url) = get("QDRANT_URL") {
            self.store.url = url;
        }
        if let Some(host) = get("HTTP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("HTTP_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("HTTP_PORT must be a port number, got '{}'", port))?;
        }

        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be at least 1");
        }
        if self.ingestion.concurrency == 0 {
            bail!("ingestion.concurrency must be at least 1");
        }
        if self.chunking.min_chunk_chars > self.chunking.max_chunk_chars {
            bail!(
                "chunking.min_chunk_chars ({}) exceeds chunking.max_chunk_chars ({})",
                self.chunking.min_chunk_chars,
                self.chunking.max_chunk_chars
            );
        }
        if self.providers.embedding_dimension == 0 {
            bail!("providers.embedding_dimension must be at least 1");
        }
        if self.server.max_upload_bytes == 0 {
            bail!("server.max_upload_bytes must be at least 1");
        }
        Ok(())
    }
}
