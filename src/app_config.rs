use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::database::target::{ConnectionTarget, FileTarget, NetworkTarget};
use crate::file_utils::FileManager;
use crate::translation::{CachePolicy, PipelineConfig, PromptPair};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Database to query
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Text-to-SQL provider config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Cache, explanation and timeouts
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Database backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    // @backend: Local SQLite file
    #[default]
    Sqlite,
    // @backend: MySQL server
    Mysql,
}

/// Database connection settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,

    /// SQLite database file
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,

    /// Open the SQLite file without write access
    #[serde(default = "default_true")]
    pub read_only: bool,

    #[serde(default)]
    pub mysql: MySqlConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            sqlite_path: default_sqlite_path(),
            read_only: true,
            mysql: MySqlConfig::default(),
        }
    }
}

impl DatabaseConfig {
    /// Connection target described by these settings
    pub fn to_target(&self) -> Result<ConnectionTarget> {
        match self.backend {
            DatabaseBackend::Sqlite => Ok(ConnectionTarget::File(FileTarget {
                path: self.sqlite_path.clone(),
                read_only: self.read_only,
            })),
            DatabaseBackend::Mysql => {
                let target = NetworkTarget::new(
                    &self.mysql.host,
                    &self.mysql.port,
                    &self.mysql.user,
                    &self.mysql.password,
                    &self.mysql.database,
                )?;
                Ok(ConnectionTarget::Network(target))
            }
        }
    }
}

/// MySQL connection settings
#[derive(Serialize, Deserialize, Clone)]
pub struct MySqlConfig {
    #[serde(default = "default_mysql_host")]
    pub host: String,

    // @field: Textual so that a non-numeric port is reported by validation
    #[serde(default = "default_mysql_port")]
    pub port: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub database: String,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: default_mysql_host(),
            port: default_mysql_port(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
        }
    }
}

impl std::fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Groq (OpenAI-compatible hosted API)
    #[default]
    Groq,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: Ollama
    Ollama,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Groq => "Groq",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Groq => "groq".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Environment variable holding the API key, if the provider needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Groq => Some("GROQ_API_KEY"),
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama | Self::LMStudio => None,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        self.api_key_env().is_some()
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds for one HTTP request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(provider_type),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt for SQL generation
    #[serde(default = "default_sql_system_prompt")]
    pub sql_system_prompt: String,

    /// User message for SQL generation
    /// Placeholder: {question}
    #[serde(default = "default_sql_user_template")]
    pub sql_user_template: String,

    /// System prompt for explanations
    #[serde(default = "default_explain_system_prompt")]
    pub explain_system_prompt: String,

    /// User message for explanations
    /// Placeholder: {question}
    #[serde(default = "default_explain_user_template")]
    pub explain_user_template: String,

    /// Temperature parameter for text generation, provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Completion length limit, provider default when unset
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            sql_system_prompt: default_sql_system_prompt(),
            sql_user_template: default_sql_user_template(),
            explain_system_prompt: default_explain_system_prompt(),
            explain_user_template: default_explain_user_template(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl TranslationCommonConfig {
    pub fn sql_prompt(&self) -> PromptPair {
        PromptPair::new(&self.sql_system_prompt, &self.sql_user_template)
    }

    pub fn explain_prompt(&self) -> PromptPair {
        PromptPair::new(&self.explain_system_prompt, &self.explain_user_template)
    }
}

/// Result cache eviction policy
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicyKind {
    #[default]
    Lru,
    Unbounded,
}

/// Result cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheSettings {
    #[serde(default)]
    pub policy: CachePolicyKind,

    /// Maximum entries for the LRU policy
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            policy: CachePolicyKind::default(),
            capacity: default_cache_capacity(),
        }
    }
}

impl CacheSettings {
    pub fn to_policy(&self) -> CachePolicy {
        match self.policy {
            CachePolicyKind::Lru => CachePolicy::Lru {
                capacity: self.capacity,
            },
            CachePolicyKind::Unbounded => CachePolicy::Unbounded,
        }
    }
}

/// Query pipeline settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineSettings {
    /// Also ask the provider to explain each generated query
    #[serde(default)]
    pub explain: bool,

    /// Seconds allowed per provider call, 0 disables the limit
    #[serde(default = "default_translation_timeout_secs")]
    pub translation_timeout_secs: u64,

    /// Seconds allowed per statement, 0 disables the limit
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            explain: false,
            translation_timeout_secs: default_translation_timeout_secs(),
            execution_timeout_secs: default_execution_timeout_secs(),
            cache: CacheSettings::default(),
        }
    }
}

impl PipelineSettings {
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        let limit = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        PipelineConfig {
            explain: self.explain,
            translation_timeout: limit(self.translation_timeout_secs),
            execution_timeout: limit(self.execution_timeout_secs),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlchat")
        .join("student.db")
}

fn default_mysql_host() -> String {
    "localhost".to_string()
}

fn default_mysql_port() -> String {
    "3306".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_translation_timeout_secs() -> u64 {
    60
}

fn default_execution_timeout_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    256
}

fn default_endpoint(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Groq => "https://api.groq.com/openai/v1",
        TranslationProvider::OpenAI => "https://api.openai.com/v1",
        TranslationProvider::Anthropic => "https://api.anthropic.com",
        TranslationProvider::Ollama => "http://localhost:11434",
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        TranslationProvider::LMStudio => "http://localhost:1234/v1",
    }
    .to_string()
}

fn default_model(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Groq => "llama3-8b-8192",
        TranslationProvider::OpenAI => "gpt-4o-mini",
        TranslationProvider::Anthropic => "claude-3-haiku-20240307",
        TranslationProvider::Ollama => "llama3",
        // Placeholder; users should set to the loaded model name in LM Studio
        TranslationProvider::LMStudio => "local-model",
    }
    .to_string()
}

fn default_sql_system_prompt() -> String {
    "You are an assistant that generates SQL queries.".to_string()
}

fn default_sql_user_template() -> String {
    "Generate a SQL query for: {question}".to_string()
}

fn default_explain_system_prompt() -> String {
    "You are an assistant that explains SQL query generation.".to_string()
}

fn default_explain_user_template() -> String {
    "Explain how the SQL query was generated for: {question}".to_string()
}

impl Config {
    /// Load `path`, or write and return the default config when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if FileManager::file_exists(path) {
            let content = FileManager::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path));
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Self::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(path, &config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Resolve the active provider's API key: explicit value, then the
    /// provider's environment variable, then whatever the config holds
    pub fn apply_api_key(&mut self, explicit: Option<String>) {
        let from_env = self
            .translation
            .provider
            .api_key_env()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.trim().is_empty());

        if let Some(key) = explicit.or(from_env) {
            self.translation.active_provider_config_mut().api_key = key;
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let provider = self.translation.provider;

        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider (set {} or --api-key)",
                provider.display_name(),
                provider.api_key_env().unwrap_or("an API key")
            ));
        }

        let endpoint = self.translation.get_endpoint();
        let parsed = Url::parse(&endpoint)
            .map_err(|e| anyhow!("Invalid endpoint '{}' for {}: {}", endpoint, provider.display_name(), e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("Endpoint '{}' must use http or https", endpoint));
        }

        if self.database.backend == DatabaseBackend::Mysql {
            self.database
                .to_target()
                .context("Invalid MySQL settings")?;
        }

        let cache = &self.pipeline.cache;
        if cache.policy == CachePolicyKind::Lru && cache.capacity == 0 {
            return Err(anyhow!("Cache capacity must be at least 1 for the lru policy"));
        }

        Ok(())
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Active provider entry, added with defaults when absent
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.model.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model(self.provider))
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.endpoint.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| default_endpoint(self.provider))
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Groq),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
