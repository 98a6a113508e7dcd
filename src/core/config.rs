//! Configuration management for the public API server.
//!
//! This module handles loading and parsing configuration from YAML files,
//! with support for environment variable expansion and environment overrides.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Whether to verify SSL certificates for upstream requests
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Request timeout in seconds for upstream calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upstream provider settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Public API access settings
    #[serde(default)]
    pub public: PublicConfig,

    /// Token pools
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Catalog override; empty means the built-in model table
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            verify_ssl: default_verify_ssl(),
            request_timeout_secs: default_request_timeout(),
            upstream: UpstreamConfig::default(),
            public: PublicConfig::default(),
            tokens: TokenConfig::default(),
            models: vec![],
        }
    }
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible upstream, without the `/v1` suffix
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
        }
    }
}

/// Public API access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicConfig {
    /// When false every protected public route answers 403
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Public key required on POST routes; `None` leaves them open
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            key: None,
        }
    }
}

/// Token pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Optional JSON token file, reloaded when it changes on disk
    #[serde(default)]
    pub file: Option<String>,

    /// Pools declared inline
    #[serde(default)]
    pub pools: Vec<TokenPoolConfig>,

    /// How long a token rejected by the upstream stays out of rotation
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            file: None,
            pools: vec![],
            cooldown_secs: default_cooldown(),
        }
    }
}

/// A named token pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPoolConfig {
    pub name: String,
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

/// A token, either bare or with an enabled flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenEntry {
    Plain(String),
    Detailed {
        token: String,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
}

impl TokenEntry {
    pub fn token(&self) -> &str {
        match self {
            TokenEntry::Plain(token) => token,
            TokenEntry::Detailed { token, .. } => token,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            TokenEntry::Plain(token) => !token.trim().is_empty(),
            TokenEntry::Detailed { token, enabled } => *enabled && !token.trim().is_empty(),
        }
    }
}

/// Token tier a model draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    #[default]
    Basic,
    Super,
}

/// A catalog entry declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub tier: ModelTier,
    #[serde(default)]
    pub is_image: bool,
    #[serde(default)]
    pub is_image_edit: bool,
    #[serde(default)]
    pub is_video: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_verify_ssl() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    300
}

fn default_upstream_base_url() -> String {
    "https://api.x.ai".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_cooldown() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use grok_public_api::core::config::AppConfig;
    ///
    /// let config = AppConfig::load("config.yaml").expect("Failed to load config");
    /// ```
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        // Expand environment variables
        let expanded = expand_env_vars(&content);

        let mut config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(&expanded, config::FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Build configuration from defaults and environment variables only.
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `path` when it exists, otherwise fall back to [`AppConfig::from_env`].
    pub fn load_or_env(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            tracing::info!(path = %path, "Loading configuration file");
            Self::load(path)
        } else {
            tracing::info!(path = %path, "Config file not found, using environment");
            Self::from_env()
        }
    }

    /// Environment variables take precedence over file values.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }

        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(verify_ssl_str) = std::env::var("VERIFY_SSL") {
            self.verify_ssl = str_to_bool(&verify_ssl_str);
        }

        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                self.request_timeout_secs = timeout;
            }
        }

        if let Ok(base_url) = std::env::var("UPSTREAM_BASE_URL") {
            self.upstream.base_url = base_url;
        }

        if let Ok(key) = std::env::var("PUBLIC_KEY") {
            self.public.key = if key.trim().is_empty() { None } else { Some(key) };
        }

        if let Ok(enabled) = std::env::var("PUBLIC_ENABLED") {
            self.public.enabled = str_to_bool(&enabled);
        }

        if let Ok(file) = std::env::var("TOKEN_FILE") {
            self.tokens.file = Some(file);
        }
    }
}

/// Expand environment variables in configuration content.
///
/// Supports patterns: ${VAR}, ${VAR:-default}, ${VAR:default}
fn expand_env_vars(content: &str) -> String {
    let re = match Regex::new(r#"\$\{([^}:]+)(?::-?([^}]*))?\}"#) {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
    })
    .to_string()
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
