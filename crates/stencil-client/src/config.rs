//! # Client Configuration
//!
//! Endpoint, timeout and policy settings for the context clients.
//!
//! ## Load Order
//! ```text
//! ┌───────────────────┐   ┌───────────────────┐   ┌───────────────────┐
//! │ 1. Defaults       │──►│ 2. stencil.toml   │──►│ 3. STENCIL_* env  │──► validate()
//! └───────────────────┘   └───────────────────┘   └───────────────────┘
//! ```
//!
//! ## Example File
//! ```toml
//! [api]
//! base_url = "https://api.example.com/api/v1"
//! timeout_secs = 30
//!
//! [identities.platform]
//! base_url = "https://admin-api.example.com/api/v1"
//!
//! [demo]
//! token_prefix = "demo_token_"
//!
//! [anonymous]
//! write_allow_list = ["contact", "contact/*", "newsletter/subscribe"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stencil_core::{UserType, DEFAULT_DEMO_TOKEN_PREFIX};
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting has an unusable value.
    #[error("Invalid client configuration: {0}")]
    Invalid(String),

    /// A base URL is not an absolute http(s) URL.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Shared HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every identity uses unless overridden.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Per-identity override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySettings {
    #[serde(default)]
    pub anonymous: IdentityEndpoint,
    #[serde(default)]
    pub tenant: IdentityEndpoint,
    #[serde(default)]
    pub platform: IdentityEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    /// Tokens starting with this prefix are demo tokens.
    #[serde(default = "default_demo_prefix")]
    pub token_prefix: String,
}

fn default_demo_prefix() -> String {
    DEFAULT_DEMO_TOKEN_PREFIX.to_string()
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            token_prefix: default_demo_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymousSettings {
    /// Public paths anonymous callers may write to.
    ///
    /// A `*` segment matches any single path segment.
    #[serde(default = "default_write_allow_list")]
    pub write_allow_list: Vec<String>,
}

fn default_write_allow_list() -> Vec<String> {
    ["contact", "contact/*", "newsletter/subscribe", "quotes/request"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AnonymousSettings {
    fn default() -> Self {
        Self {
            write_allow_list: default_write_allow_list(),
        }
    }
}

// =============================================================================
// Client Config
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub identities: IdentitySettings,

    #[serde(default)]
    pub demo: DemoSettings,

    #[serde(default)]
    pub anonymous: AnonymousSettings,
}

impl ClientConfig {
    /// Config pointing every identity at `base_url`, everything else default.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.api.base_url = base_url.into();
        config
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stencil.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.api.base_url)?;
        for user_type in UserType::ALL {
            if let Some(url) = self.endpoint(user_type).base_url.as_deref() {
                validate_url(url)?;
            }
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be greater than 0".into()));
        }
        if self.api.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.demo.token_prefix.is_empty() {
            return Err(ConfigError::Invalid("demo token_prefix must not be empty".into()));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("STENCIL_API_URL") {
            debug!(url = %url, "Overriding API base URL from environment");
            self.api.base_url = url;
        }

        for (var, user_type) in [
            ("STENCIL_PUBLIC_API_URL", UserType::Anonymous),
            ("STENCIL_TENANT_API_URL", UserType::Tenant),
            ("STENCIL_PLATFORM_API_URL", UserType::Platform),
        ] {
            if let Ok(url) = std::env::var(var) {
                debug!(url = %url, %user_type, "Overriding identity base URL from environment");
                self.endpoint_mut(user_type).base_url = Some(url);
            }
        }

        if let Ok(secs) = std::env::var("STENCIL_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(parsed) => self.api.timeout_secs = parsed,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric STENCIL_TIMEOUT_SECS"),
            }
        }

        if let Ok(prefix) = std::env::var("STENCIL_DEMO_TOKEN_PREFIX") {
            self.demo.token_prefix = prefix;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stencil", "client")
            .map(|dirs| dirs.config_dir().join("stencil.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    fn endpoint(&self, user_type: UserType) -> &IdentityEndpoint {
        match user_type {
            UserType::Anonymous => &self.identities.anonymous,
            UserType::Tenant => &self.identities.tenant,
            UserType::Platform => &self.identities.platform,
        }
    }

    fn endpoint_mut(&mut self, user_type: UserType) -> &mut IdentityEndpoint {
        match user_type {
            UserType::Anonymous => &mut self.identities.anonymous,
            UserType::Tenant => &mut self.identities.tenant,
            UserType::Platform => &mut self.identities.platform,
        }
    }

    /// Base URL for an identity, falling back to `api.base_url`.
    pub fn base_url_for(&self, user_type: UserType) -> &str {
        self.endpoint(user_type)
            .base_url
            .as_deref()
            .unwrap_or(&self.api.base_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.api.connect_timeout_secs)
    }
}

fn validate_url(raw: &str) -> ConfigResult<()> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl(format!(
            "Base URL must use http:// or https://, got {other}:// in {raw}"
        ))),
    }
}
