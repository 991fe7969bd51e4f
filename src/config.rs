//! Configuration parsing and validation for openai-proxy.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

/// Token sent upstream when none is configured.
pub const DEFAULT_AUTH_TOKEN: &str = "none";

/// Environment variable consulted when `upstream.auth_token` is absent.
pub const AUTH_TOKEN_ENV_VAR: &str = "OPENAI_PROXY_AUTH_TOKEN";

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Path prefix the completion routes are mounted under ("" or "/" for root)
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_route_prefix() -> String {
    "/v1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            route_prefix: default_route_prefix(),
        }
    }
}

/// Auth token wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw token. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How the upstream auth token was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    /// Token was a literal string in config (no ${} references)
    Literal,
    /// Token contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Token was read from the convention env var (holds var name)
    Convention(String),
    /// No token configured; the placeholder "none" is sent
    Default,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Literal => write!(f, "config-literal"),
            TokenSource::EnvExpanded => write!(f, "env-expanded"),
            TokenSource::Convention(var) => write!(f, "convention ({})", var),
            TokenSource::Default => write!(f, "default"),
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API (e.g., "https://api.openai.com/v1")
    pub base_url: String,
    pub auth_token: ApiKey,
    pub token_source: TokenSource,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl UpstreamConfig {
    /// Upstream config with the default token and timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: ApiKey::from(DEFAULT_AUTH_TOKEN),
            token_source: TokenSource::Default,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Include request and response bodies in forwarding log lines
    #[serde(default = "default_true")]
    pub log_payloads: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_payloads: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for '{field}': {message}")]
    EnvVar {
        var: String,
        field: String,
        message: String,
    },
}

/// Raw upstream section; values may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
struct RawUpstreamConfig {
    base_url: String,
    auth_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,
}

/// Raw configuration deserialized directly from TOML.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    upstream: RawUpstreamConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string (e.g., `${SCHEME}://${HOST}/v1`).
/// Fails on first missing variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, field: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            field: field.to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                field: field.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            field: field.to_string(),
            message: format!("Environment variable '{}' is not set", var_name),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

impl Config {
    /// Load configuration from a TOML file, expanding `${VAR}` from the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string, expanding `${VAR}` from the environment.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_str_with(content, |name| std::env::var(name).ok())
    }

    /// Parse configuration with a custom variable lookup.
    ///
    /// `base_url` and `auth_token` may reference variables. When `auth_token`
    /// is absent, [`AUTH_TOKEN_ENV_VAR`] is looked up, then [`DEFAULT_AUTH_TOKEN`]
    /// is used.
    pub fn parse_str_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = toml::from_str(content)?;
        let upstream = raw.upstream;

        let base_url = expand_env_vars_with(&upstream.base_url, "upstream.base_url", &lookup)?;

        let (auth_token, token_source) = match upstream.auth_token {
            Some(ref raw_token) if raw_token.contains("${") => {
                let expanded = expand_env_vars_with(raw_token, "upstream.auth_token", &lookup)?;
                (ApiKey::from(expanded), TokenSource::EnvExpanded)
            }
            Some(raw_token) => (ApiKey::from(raw_token), TokenSource::Literal),
            None => match lookup(AUTH_TOKEN_ENV_VAR) {
                Some(value) => (
                    ApiKey::from(value),
                    TokenSource::Convention(AUTH_TOKEN_ENV_VAR.to_string()),
                ),
                None => (ApiKey::from(DEFAULT_AUTH_TOKEN), TokenSource::Default),
            },
        };

        let config = Config {
            server: raw.server,
            upstream: UpstreamConfig {
                base_url,
                auth_token,
                token_source,
                timeout_secs: upstream.timeout_secs,
                connect_timeout_secs: upstream.connect_timeout_secs,
            },
            logging: raw.logging,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let base_url = &self.upstream.base_url;
        if base_url.is_empty() {
            return Err(ConfigError::Validation(
                "upstream.base_url must not be empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "upstream.base_url '{}' must start with http:// or https://",
                base_url
            )));
        }

        if self.upstream.timeout_secs == 0 || self.upstream.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "upstream timeouts must be greater than zero".to_string(),
            ));
        }

        let prefix = &self.server.route_prefix;
        if !prefix.is_empty() && prefix != "/" {
            if !prefix.starts_with('/') || prefix.ends_with('/') {
                return Err(ConfigError::Validation(format!(
                    "server.route_prefix '{}' must start with '/' and not end with '/'",
                    prefix
                )));
            }
        }

        Ok(())
    }
}
