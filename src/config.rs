//! Configuration management for dashgate.
//!
//! Loads settings from `~/.config/dashgate/config.toml` with environment overrides.
//! The result is read-only once the server starts.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Largest request body accepted by the proxy endpoints.
pub const DEFAULT_MAX_BODY_BYTES: usize = 15_000_000;

pub const DEFAULT_UPSTREAM_URL: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    #[serde(default = "default_document")]
    pub default_document: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbosity: LogVerbosity,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    Minimal,
    #[default]
    Compact,
    Verbose,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_host() -> IpAddr { IpAddr::V4(Ipv4Addr::UNSPECIFIED) }
fn default_port() -> u16 { 3000 }
fn default_public_dir() -> PathBuf { PathBuf::from("public") }
fn default_document() -> String { "index.html".to_string() }
fn default_max_body_bytes() -> usize { DEFAULT_MAX_BODY_BYTES }
fn default_upstream_url() -> String { DEFAULT_UPSTREAM_URL.to_string() }
fn default_chat_model() -> String { "qwen-plus".to_string() }
fn default_vision_model() -> String { "qwen-vl-plus".to_string() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_dir: default_public_dir(),
            default_document: default_document(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_key: None,
            chat_model: default_chat_model(),
            vision_model: default_vision_model(),
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dashgate")
            .join("config.toml")
    }

    /// Load config from file, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from a specific path.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Apply process environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse().ok()) {
            self.gateway.port = port;
        }
        if let Some(host) = lookup("HOST").and_then(|v| v.trim().parse().ok()) {
            self.gateway.host = host;
        }
        if let Some(dir) = lookup("DASHGATE_PUBLIC_DIR").filter(|v| !v.is_empty()) {
            self.gateway.public_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("DASHSCOPE_URL").filter(|v| !v.is_empty()) {
            self.upstream.url = url;
        }
        if let Some(key) = lookup("DASHSCOPE_API_KEY") {
            self.upstream.api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        self
    }

    /// Upstream API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.upstream
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Address the gateway listens on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.gateway.host, self.gateway.port)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn loads_config_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, r#"
[gateway]
port = 9090
public_dir = "/srv/www"

[upstream]
api_key = "sk-test-key"
chat_model = "qwen-max"
"#).unwrap();

        let config = Config::load_from(config_path).unwrap();

        assert_eq!(config.gateway.port, 9090);
        assert_eq!(config.gateway.public_dir, PathBuf::from("/srv/www"));
        assert_eq!(config.api_key(), Some("sk-test-key"));
        assert_eq!(config.upstream.chat_model, "qwen-max");
        assert_eq!(config.upstream.vision_model, "qwen-vl-plus");
    }

    #[test]
    fn returns_defaults_when_file_missing() {
        let config = Config::load_from(PathBuf::from("/nonexistent/path/config.toml")).unwrap();

        assert_eq!(config.gateway.port, 3000);
        assert!(config.gateway.host.is_unspecified(), "binds all interfaces by default");
        assert_eq!(config.gateway.default_document, "index.html");
        assert_eq!(config.gateway.max_body_bytes, 15_000_000);
        assert_eq!(config.upstream.url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[gateway\nport = ").unwrap();

        let result = Config::load_from(config_path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn environment_overrides_take_precedence_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[gateway]\nport = 8080\n").unwrap();

        let config = Config::load_from(config_path)
            .unwrap()
            .with_overrides_from(lookup_from(&[
                ("PORT", "4000"),
                ("DASHSCOPE_API_KEY", "env-key"),
                ("DASHSCOPE_URL", "http://localhost:9999/v1/chat/completions"),
            ]));

        assert_eq!(config.gateway.port, 4000);
        assert_eq!(config.api_key(), Some("env-key"));
        assert_eq!(config.upstream.url, "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let config = Config::default().with_overrides_from(lookup_from(&[("DASHSCOPE_API_KEY", "")]));
        assert_eq!(config.api_key(), None);

        let config = Config {
            upstream: UpstreamConfig {
                api_key: Some("   ".to_string()),
                ..UpstreamConfig::default()
            },
            ..Config::default()
        };
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn unparsable_port_override_is_ignored() {
        let config = Config::default().with_overrides_from(lookup_from(&[("PORT", "not-a-port")]));
        assert_eq!(config.gateway.port, 3000);
    }

    #[test]
    fn parses_all_log_verbosity_levels() {
        let dir = tempfile::tempdir().unwrap();

        for (value, expected) in [
            ("minimal", LogVerbosity::Minimal),
            ("compact", LogVerbosity::Compact),
            ("verbose", LogVerbosity::Verbose),
        ] {
            let config_path = dir.path().join(format!("config_{}.toml", value));
            fs::write(&config_path, format!(r#"
[logging]
verbosity = "{}"
format = "json"
"#, value)).unwrap();

            let config = Config::load_from(config_path).unwrap();
            assert_eq!(config.logging.verbosity, expected);
            assert_eq!(config.logging.format, LogFormat::Json);
        }
    }

    #[test]
    fn renders_round_trippable_toml() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn listen_addr_combines_host_and_port() {
        let config = Config::default();
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:3000");
    }
}
