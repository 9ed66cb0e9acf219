//! Configuration module for the VK API plugin.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Result, VkApiError};

/// Environment variable that overrides the community token.
pub const TOKEN_ENV_VAR: &str = "VKAPI_TOKEN";

/// VK API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VkConfig {
    /// Community access token. Required to start the plugin.
    #[serde(default)]
    pub token: String,
    /// Log opted-out recipients (API error 901) at debug level instead of warn.
    #[serde(default)]
    pub mute_disallowed_warning: bool,
    /// Base URL of the method endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API version sent with every request.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Delay after each request, in milliseconds.
    #[serde(default = "default_post_delay")]
    pub post_delay_ms: u64,
}

fn default_api_url() -> String {
    "https://api.vk.com/method".to_string()
}

fn default_api_version() -> String {
    "5.37".to_string()
}

fn default_post_delay() -> u64 {
    500
}

impl VkConfig {
    /// Post-request delay as a `Duration`.
    pub fn post_delay(&self) -> Duration {
        Duration::from_millis(self.post_delay_ms)
    }
}

impl Default for VkConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            mute_disallowed_warning: false,
            api_url: default_api_url(),
            api_version: default_api_version(),
            post_delay_ms: default_post_delay(),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("vkapi/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
    /// Whether to write logs to `file` in addition to stdout.
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/vkapi.log".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            to_file: default_log_to_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// VK API configuration.
    #[serde(default)]
    pub vk: VkConfig,
    /// HTTP client configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VkApiError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration, writing a default file first if none exists.
    ///
    /// The freshly written file has an empty token, so the returned config
    /// fails `validate` until the operator fills it in.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            Self::default().save(path)?;
        }
        Self::load_with_env(path)
    }

    /// Write this configuration as TOML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| VkApiError::Config(format!("config serialize error: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VkApiError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `VKAPI_TOKEN`: Override the community token
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.is_empty() {
                self.vk.token = token;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The community token is empty
    /// - The API URL is not an absolute http(s) URL
    /// - The API version is empty
    pub fn validate(&self) -> Result<()> {
        if self.vk.token.is_empty() {
            return Err(VkApiError::Config(format!(
                "community token required. Set vk.token in the config file or via {TOKEN_ENV_VAR}."
            )));
        }

        let url = url::Url::parse(&self.vk.api_url)
            .map_err(|e| VkApiError::Config(format!("invalid api_url: {e}")))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(VkApiError::Config(format!(
                    "unsupported api_url scheme: {scheme}"
                )));
            }
        }

        if self.vk.api_version.is_empty() {
            return Err(VkApiError::Config("api_version is empty".to_string()));
        }
        Ok(())
    }
}
