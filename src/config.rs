//! Configuration loading and constants.
//!
//! Configuration is assembled in three layers: built-in defaults, an optional
//! TOML file, and environment variables (highest priority). Secrets are
//! normally supplied through the environment so the TOML file can be checked
//! in. `AppConfig` is the validated root configuration used by the server.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// Service Identity
// =============================================================================

/// Version reported by `/health`, `/`, and upstream identification headers
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by `/health`
pub const HEALTH_SERVICE_NAME: &str = "mcp-server";

/// Value of the `X-MCP-Service` header sent to the Platform API
pub const MCP_SERVICE_HEADER_VALUE: &str = "claude-mcp-server";

/// User agent for outbound requests
pub const USER_AGENT: &str = formatcp!("fleet-mcp/{}", SERVICE_VERSION);

/// MCP protocol revision announced by the stdio bridge
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Server name announced by the stdio bridge during `initialize`
pub const BRIDGE_SERVER_NAME: &str = "fleet-mcp-bridge";

// =============================================================================
// HTTP Server
// =============================================================================

/// Default bind address (all interfaces, for container use)
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Default listen port, matches the container's exposed port
pub const DEFAULT_HTTP_PORT: u16 = 3001;

/// Seconds to wait for in-flight requests during graceful shutdown
pub const SHUTDOWN_DRAIN_SECS: u64 = 30;

/// Responses carry live upstream data and must never be cached
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

// =============================================================================
// Upstream API
// =============================================================================

/// Total timeout in seconds for a single upstream request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Attempts per upstream request before giving up
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Seconds before token expiry at which a refresh would be attempted
pub const DEFAULT_TOKEN_REFRESH_THRESHOLD_SECS: u64 = 300;

// =============================================================================
// Stdio Bridge
// =============================================================================

/// Server URL used by the bridge when `MCP_SERVER_URL` is unset
pub const DEFAULT_BRIDGE_SERVER_URL: &str = "http://localhost:3001";

/// Bearer token used by the bridge when `MCP_SERVER_TOKEN` is unset
pub const DEFAULT_BRIDGE_TOKEN: &str = "local-dev-token";

/// Timeout in seconds for bridge requests to the HTTP server
pub const BRIDGE_REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Configuration file read when `--config` is not given (optional)
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Default log filter when neither `--log-level`, `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_FILTER: &str = "fleet_mcp=info,tower_http=info";

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server configuration
    pub http: HttpServerConfig,
    /// Upstream API endpoints and retry policy
    pub upstream: UpstreamConfig,
    /// Service and upstream credentials
    pub auth: AuthConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: TlsConfig,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            tls: TlsConfig::default(),
        }
    }
}

/// TLS mode for the listener
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain HTTP (default; TLS usually terminates at the orchestrator)
    #[default]
    None,
    /// User-provided certificate and key files
    Manual,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub mode: TlsMode,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Upstream API configuration
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the fleet data (DCH) API
    pub dch_api_url: String,
    /// Base URL of the Platform API
    pub platform_api_url: String,
    pub request_timeout_seconds: u64,
    pub max_retry_attempts: u32,
    pub token_refresh_threshold_seconds: u64,
}

/// Credentials. All three tokens are required.
#[derive(Clone)]
pub struct AuthConfig {
    /// Bearer token clients must present to this server
    pub mcp_server_token: String,
    /// Token forwarded to the DCH API
    pub dch_api_token: String,
    /// Token forwarded to the Platform API
    pub platform_api_token: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mcp_server_token", &"<redacted>")
            .field("dch_api_token", &"<redacted>")
            .field("platform_api_token", &"<redacted>")
            .finish()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable (default)
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Validation(format!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                other
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

// -----------------------------------------------------------------------------
// File representation (everything optional, validated into AppConfig)
// -----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    http: HttpServerConfig,
    upstream: FileUpstreamConfig,
    auth: FileAuthConfig,
    logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FileUpstreamConfig {
    dch_api_url: Option<String>,
    platform_api_url: Option<String>,
    request_timeout_seconds: u64,
    max_retry_attempts: u32,
    token_refresh_threshold_seconds: u64,
}

impl Default for FileUpstreamConfig {
    fn default() -> Self {
        Self {
            dch_api_url: None,
            platform_api_url: None,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            token_refresh_threshold_seconds: DEFAULT_TOKEN_REFRESH_THRESHOLD_SECS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileAuthConfig {
    mcp_server_token: Option<String>,
    dch_api_token: Option<String>,
    platform_api_token: Option<String>,
}

impl FileConfig {
    /// Overlay environment variables. Empty values count as unset.
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("HOST") {
            self.http.host = host;
        }
        if let Some(port) = get("PORT") {
            self.http.port = parse_env("PORT", &port)?;
        }
        if let Some(url) = get("DCH_API_URL") {
            self.upstream.dch_api_url = Some(url);
        }
        if let Some(url) = get("PLATFORM_API_URL") {
            self.upstream.platform_api_url = Some(url);
        }
        if let Some(v) = get("REQUEST_TIMEOUT") {
            self.upstream.request_timeout_seconds = parse_env("REQUEST_TIMEOUT", &v)?;
        }
        if let Some(v) = get("MAX_RETRY_ATTEMPTS") {
            self.upstream.max_retry_attempts = parse_env("MAX_RETRY_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("TOKEN_REFRESH_THRESHOLD") {
            self.upstream.token_refresh_threshold_seconds =
                parse_env("TOKEN_REFRESH_THRESHOLD", &v)?;
        }
        if let Some(token) = get("MCP_SERVER_TOKEN") {
            self.auth.mcp_server_token = Some(token);
        }
        if let Some(token) = get("DCH_API_TOKEN") {
            self.auth.dch_api_token = Some(token);
        }
        if let Some(token) = get("PLATFORM_API_TOKEN") {
            self.auth.platform_api_token = Some(token);
        }
        if let Some(format) = get("LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    fn validate(self) -> Result<AppConfig, ConfigError> {
        let FileAuthConfig {
            mcp_server_token,
            dch_api_token,
            platform_api_token,
        } = self.auth;

        let mut missing = Vec::new();
        if is_blank(&mcp_server_token) {
            missing.push("MCP_SERVER_TOKEN");
        }
        if is_blank(&dch_api_token) {
            missing.push("DCH_API_TOKEN");
        }
        if is_blank(&platform_api_token) {
            missing.push("PLATFORM_API_TOKEN");
        }
        if !missing.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let dch_api_url = require_url(self.upstream.dch_api_url, "DCH_API_URL")?;
        let platform_api_url = require_url(self.upstream.platform_api_url, "PLATFORM_API_URL")?;

        if self.http.tls.mode == TlsMode::Manual
            && (self.http.tls.cert_path.is_none() || self.http.tls.key_path.is_none())
        {
            return Err(ConfigError::Validation(
                "http.tls.mode = \"manual\" requires both cert_path and key_path".to_string(),
            ));
        }

        Ok(AppConfig {
            http: self.http,
            upstream: UpstreamConfig {
                dch_api_url,
                platform_api_url,
                request_timeout_seconds: self.upstream.request_timeout_seconds,
                max_retry_attempts: self.upstream.max_retry_attempts,
                token_refresh_threshold_seconds: self.upstream.token_refresh_threshold_seconds,
            },
            auth: AuthConfig {
                mcp_server_token: mcp_server_token.unwrap_or_default(),
                dch_api_token: dch_api_token.unwrap_or_default(),
                platform_api_token: platform_api_token.unwrap_or_default(),
            },
            logging: self.logging,
        })
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::is_empty).unwrap_or(true)
}

/// Trailing slashes are stripped so paths can be appended with `format!`.
fn require_url(value: Option<String>, name: &str) -> Result<String, ConfigError> {
    match value.filter(|v| !v.is_empty()) {
        Some(url) => Ok(url.trim_end_matches('/').to_string()),
        None => Err(ConfigError::Validation(format!(
            "{} environment variable is required",
            name
        ))),
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::Validation(format!("{} must be a non-negative integer, got '{}'", name, value))
    })
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the process environment.
    ///
    /// An explicitly given path must exist. Without one, `DEFAULT_CONFIG_PATH`
    /// is read only if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let contents = match path {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Some(std::fs::read_to_string(default)?)
                } else {
                    None
                }
            }
        };

        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build configuration from file contents and an environment lookup.
    pub fn from_sources<F>(contents: Option<&str>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: FileConfig = match contents {
            Some(contents) => toml::from_str(contents)?,
            None => FileConfig::default(),
        };
        config.apply_env(lookup)?;
        config.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MCP_SERVER_TOKEN", "server-token"),
            ("DCH_API_TOKEN", "dch-token"),
            ("PLATFORM_API_TOKEN", "platform-token"),
            ("DCH_API_URL", "https://dch.example.com/api/"),
            ("PLATFORM_API_URL", "https://platform.example.com"),
        ]
    }

    #[test]
    fn test_defaults_from_environment_only() {
        let config = AppConfig::from_sources(None, env(&full_env())).unwrap();
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 3001);
        assert_eq!(config.http.tls.mode, TlsMode::None);
        assert_eq!(config.upstream.max_retry_attempts, 3);
        assert_eq!(config.upstream.request_timeout_seconds, 30);
        assert_eq!(config.upstream.token_refresh_threshold_seconds, 300);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.auth.mcp_server_token, "server-token");
    }

    #[test]
    fn test_trailing_slash_stripped_from_urls() {
        let config = AppConfig::from_sources(None, env(&full_env())).unwrap();
        assert_eq!(config.upstream.dch_api_url, "https://dch.example.com/api");
    }

    #[test]
    fn test_missing_tokens_reported_together() {
        let err = AppConfig::from_sources(
            None,
            env(&[
                ("DCH_API_TOKEN", "dch-token"),
                ("DCH_API_URL", "https://dch.example.com"),
                ("PLATFORM_API_URL", "https://platform.example.com"),
            ]),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variables: MCP_SERVER_TOKEN, PLATFORM_API_TOKEN"
        );
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let mut vars = full_env();
        vars.retain(|(k, _)| *k != "DCH_API_TOKEN");
        vars.push(("DCH_API_TOKEN", ""));
        let err = AppConfig::from_sources(None, env(&vars)).unwrap_err();
        assert!(err.to_string().contains("DCH_API_TOKEN"));
    }

    #[test]
    fn test_missing_dch_url() {
        let mut vars = full_env();
        vars.retain(|(k, _)| *k != "DCH_API_URL");
        let err = AppConfig::from_sources(None, env(&vars)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: DCH_API_URL environment variable is required"
        );
    }

    #[test]
    fn test_missing_platform_url() {
        let mut vars = full_env();
        vars.retain(|(k, _)| *k != "PLATFORM_API_URL");
        let err = AppConfig::from_sources(None, env(&vars)).unwrap_err();
        assert!(err.to_string().contains("PLATFORM_API_URL"));
    }

    #[test]
    fn test_env_overrides_file() {
        let toml = r#"
            [http]
            port = 8080

            [upstream]
            dch_api_url = "https://file-dch.example.com"
            max_retry_attempts = 5

            [logging]
            format = "json"
        "#;
        let mut vars = full_env();
        vars.push(("PORT", "9090"));
        let config = AppConfig::from_sources(Some(toml), env(&vars)).unwrap();
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.upstream.dch_api_url, "https://dch.example.com/api");
        assert_eq!(config.upstream.max_retry_attempts, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_file_supplies_everything() {
        let toml = r#"
            [upstream]
            dch_api_url = "https://dch.example.com"
            platform_api_url = "https://platform.example.com"

            [auth]
            mcp_server_token = "a"
            dch_api_token = "b"
            platform_api_token = "c"
        "#;
        let config = AppConfig::from_sources(Some(toml), env(&[])).unwrap();
        assert_eq!(config.auth.platform_api_token, "c");
    }

    #[test]
    fn test_invalid_numeric_env() {
        let mut vars = full_env();
        vars.push(("MAX_RETRY_ATTEMPTS", "three"));
        let err = AppConfig::from_sources(None, env(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_log_format() {
        let mut vars = full_env();
        vars.push(("LOG_FORMAT", "xml"));
        assert!(AppConfig::from_sources(None, env(&vars)).is_err());
    }

    #[test]
    fn test_manual_tls_requires_paths() {
        let toml = r#"
            [http.tls]
            mode = "manual"
            cert_path = "/etc/fleet-mcp/cert.pem"
        "#;
        let err = AppConfig::from_sources(Some(toml), env(&full_env())).unwrap_err();
        assert!(err.to_string().contains("cert_path and key_path"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_sources(Some("[http"), env(&full_env())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = \"not-a-port\"").unwrap();
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/fleet-mcp.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_auth_debug_redacts_tokens() {
        let config = AppConfig::from_sources(None, env(&full_env())).unwrap();
        let debug = format!("{:?}", config.auth);
        assert!(!debug.contains("server-token"));
        assert!(debug.contains("<redacted>"));
    }
}
