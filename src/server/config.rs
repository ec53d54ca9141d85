//! Configuration loading for huginnd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! Without any file the built-in defaults apply.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.huginn/secrets.toml` (user, must be 0600)
//! 2. `/etc/huginn/secrets.toml` (system, must be 0600)
//! 3. `GROQ_API_KEY` environment variable

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::gateway::DEFAULT_HISTORY_LIMIT;
use crate::providers::{GroqOptions, RetryConfig, groq};
use crate::{HuginnError, Result};

/// Environment variable consulted when no secrets file provides a key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub queue: QueueSection,
    #[serde(default)]
    pub fetch: FetchSection,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3000).
    #[serde(default = "default_address")]
    pub address: String,
    /// Directory of static web UI files served at `/`.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            static_dir: None,
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:3000".to_string()
}

/// Completion provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Provider HTTP timeout in seconds (default: 120).
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
    /// Replaces the built-in system prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Prior turns forwarded as context (default: 10).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_completion_timeout(),
            system_prompt: None,
            history_limit: default_history_limit(),
        }
    }
}

fn default_base_url() -> String {
    groq::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    groq::DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_completion_timeout() -> u64 {
    120
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Entry lifetime in seconds (default: 300).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Optional bound on the number of cached responses.
    #[serde(default)]
    pub max_entries: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            max_entries: None,
        }
    }
}

fn default_ttl() -> u64 {
    300
}

/// Rate-limit retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Total attempts per request, the first one included (default: 10).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds (default: 500).
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay() -> u64 {
    500
}

/// Completion queue settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSection {
    /// Pause between consecutive entries in milliseconds (default: 100).
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing(),
        }
    }
}

fn default_pacing() -> u64 {
    100
}

/// Page fetch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSection {
    /// Download timeout in seconds (default: 15).
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    15
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub groq: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    ///
    /// Falls back to defaults when no file is found.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse one config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn groq_options(&self) -> GroqOptions {
        let c = &self.completion;
        GroqOptions {
            base_url: c.base_url.clone(),
            model: c.model.clone(),
            temperature: c.temperature,
            max_tokens: c.max_tokens,
            timeout: Duration::from_secs(c.timeout_secs),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.retry.max_attempts)
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
    }

    pub fn cache_config(&self) -> CacheConfig {
        let config = CacheConfig::new().ttl(Duration::from_secs(self.cache.ttl_secs));
        match self.cache.max_entries {
            Some(max) => config.max_entries(max),
            None => config,
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.queue.pacing_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.huginn/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/huginn/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (the key may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".huginn").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/huginn/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Parse one secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(HuginnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Groq API key, falling back to `GROQ_API_KEY`.
    pub fn groq_api_key(&self) -> Option<String> {
        self.groq
            .as_ref()
            .map(|s| s.api_key.clone())
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(GROQ_API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}
