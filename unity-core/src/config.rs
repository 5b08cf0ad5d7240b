//! Configuration management
//!
//! Settings come from a TOML file, from `UNITY_*` environment variables, or
//! both (environment wins).

use crate::error::{ErrorContext, UnityError, UnityResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const ENV_ENDPOINT: &str = "UNITY_ENDPOINT";
pub const ENV_INSECURE: &str = "UNITY_INSECURE";
pub const ENV_USERNAME: &str = "UNITY_USERNAME";
pub const ENV_PASSWORD: &str = "UNITY_PASSWORD";
pub const ENV_TIMEOUT_SECONDS: &str = "UNITY_TIMEOUT_SECONDS";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "UNITY_OPERATION_TIMEOUT_MS";
/// Names read by earlier deployments; `UNITY_*` wins when both are set
pub const LEGACY_ENV_ENDPOINT: &str = "GOUNITY_ENDPOINT";
pub const LEGACY_ENV_INSECURE: &str = "GOUNITY_INSECURE";

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_USER_AGENT: &str = "unity-rs/0.1";

/// Endpoint and credentials used to log in to the array
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Management address, e.g. `https://10.0.0.1`
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Skip certificate validation
    pub insecure: bool,
}

impl ConnectConfig {
    pub fn new(endpoint: &str, username: &str, password: &str, insecure: bool) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            insecure,
        }
    }

    /// Load from `UNITY_ENDPOINT`, `UNITY_USERNAME`, `UNITY_PASSWORD` and `UNITY_INSECURE`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            endpoint: endpoint_var(&lookup).unwrap_or_default(),
            username: lookup(ENV_USERNAME).unwrap_or_default(),
            password: lookup(ENV_PASSWORD).unwrap_or_default(),
            insecure: parse_bool(insecure_var(&lookup), false),
        }
    }
}

// Never print the password
impl fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// HTTP tuning shared by every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Transport timeout applied by the HTTP client
    pub timeout_seconds: u64,
    /// Deadline for one transport call made by the session layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            operation_timeout_ms: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Everything needed to build a client for one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub endpoint: String,
    pub insecure: bool,
    pub http: HttpSettings,
}

impl ClientSettings {
    pub fn new(endpoint: &str, insecure: bool) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            insecure,
            http: HttpSettings::default(),
        }
    }

    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    /// Load from `UNITY_ENDPOINT`, `UNITY_INSECURE`, `UNITY_TIMEOUT_SECONDS`
    /// and `UNITY_OPERATION_TIMEOUT_MS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut http = HttpSettings::default();
        apply_http_overrides(&mut http, &lookup);

        Self {
            endpoint: endpoint_var(&lookup).unwrap_or_default(),
            insecure: parse_bool(insecure_var(&lookup), false),
            http,
        }
    }

    pub fn validate(&self) -> UnityResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(UnityError::Config {
                message: "missing endpoint".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set UNITY_ENDPOINT or connection.endpoint"),
            });
        }

        if self.http.timeout_seconds == 0 {
            return Err(UnityError::Config {
                message: "HTTP timeout must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set http.timeout_seconds to a positive value"),
            });
        }

        Ok(())
    }
}

/// Full configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnityConfig {
    pub connection: ConnectConfig,
    pub http: HttpSettings,
    pub logging: LoggingConfig,
}

impl UnityConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> UnityResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| UnityError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: UnityConfig = toml::from_str(&content).map_err(|e| UnityError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Load configuration from the environment only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> UnityResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| UnityError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| UnityError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Override file values with any `UNITY_*` variables that are set
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = endpoint_var(&lookup) {
            self.connection.endpoint = endpoint;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.connection.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.connection.password = password;
        }
        if let Some(insecure) = insecure_var(&lookup) {
            self.connection.insecure = parse_bool(Some(insecure), self.connection.insecure);
        }
        apply_http_overrides(&mut self.http, &lookup);
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            endpoint: self.connection.endpoint.clone(),
            insecure: self.connection.insecure,
            http: self.http.clone(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> UnityResult<()> {
        self.client_settings().validate()?;

        if self.connection.username.is_empty() {
            tracing::warn!("Array username not configured - login will fail");
        }

        Ok(())
    }
}

fn endpoint_var<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_ENDPOINT).or_else(|| lookup(LEGACY_ENV_ENDPOINT))
}

fn insecure_var<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_INSECURE).or_else(|| lookup(LEGACY_ENV_INSECURE))
}

fn apply_http_overrides<F>(http: &mut HttpSettings, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(timeout) = lookup(ENV_TIMEOUT_SECONDS).and_then(|v| v.parse().ok()) {
        http.timeout_seconds = timeout;
    }
    if let Some(deadline) = lookup(ENV_OPERATION_TIMEOUT_MS).and_then(|v| v.parse().ok()) {
        http.operation_timeout_ms = Some(deadline);
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| v.trim().to_ascii_lowercase())
        .and_then(|v| match v.as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_connect_config_from_lookup() {
        let config = ConnectConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "https://10.0.0.1"),
            (ENV_USERNAME, "admin"),
            (ENV_PASSWORD, "secret"),
            (ENV_INSECURE, "true"),
        ]));

        assert_eq!(config.endpoint, "https://10.0.0.1");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "secret");
        assert!(config.insecure);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectConfig::new("https://array", "admin", "hunter2", false);
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_client_settings_defaults_and_overrides() {
        let settings = ClientSettings::from_lookup(lookup(&[
            (ENV_ENDPOINT, "https://array"),
            (ENV_INSECURE, "not-a-bool"),
            (ENV_OPERATION_TIMEOUT_MS, "2500"),
        ]));

        assert_eq!(settings.endpoint, "https://array");
        assert!(!settings.insecure);
        assert_eq!(settings.http.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(settings.http.operation_timeout_ms, Some(2500));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_endpoint_is_config_error() {
        let settings = ClientSettings::new("", false);
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, UnityError::Config { .. }));
        assert_eq!(err.message(), "missing endpoint");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = UnityConfig::default();
        config.connection.endpoint = "https://from-file".to_string();
        config.connection.username = "file-user".to_string();

        config.apply_overrides(lookup(&[(ENV_ENDPOINT, "https://from-env")]));

        assert_eq!(config.connection.endpoint, "https://from-env");
        assert_eq!(config.connection.username, "file-user");
    }

    #[test]
    fn test_legacy_endpoint_variables() {
        let settings = ClientSettings::from_lookup(lookup(&[
            (LEGACY_ENV_ENDPOINT, "https://10.0.0.2"),
            (LEGACY_ENV_INSECURE, "true"),
        ]));
        assert_eq!(settings.endpoint, "https://10.0.0.2");
        assert!(settings.insecure);

        let config = ConnectConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "https://current"),
            (LEGACY_ENV_ENDPOINT, "https://legacy"),
        ]));
        assert_eq!(config.endpoint, "https://current");

        let mut config = UnityConfig::default();
        config.apply_overrides(lookup(&[
            (LEGACY_ENV_ENDPOINT, "https://legacy"),
            (LEGACY_ENV_INSECURE, "1"),
        ]));
        assert_eq!(config.connection.endpoint, "https://legacy");
        assert!(config.connection.insecure);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unity.toml");

        let mut config = UnityConfig::default();
        config.connection = ConnectConfig::new("https://array", "admin", "secret", true);
        config.http.operation_timeout_ms = Some(5000);
        config.save_to_file(&path).unwrap();

        let loaded = UnityConfig::from_file(&path).unwrap();
        assert_eq!(loaded.connection, config.connection);
        assert_eq!(loaded.http, config.http);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unity.toml");
        std::fs::write(
            &path,
            "[connection]\nendpoint = \"https://array\"\nusername = \"admin\"\n",
        )
        .unwrap();

        let loaded = UnityConfig::from_file(&path).unwrap();
        assert_eq!(loaded.connection.endpoint, "https://array");
        assert_eq!(loaded.http.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_unparsable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unity.toml");
        std::fs::write(&path, "[connection\nendpoint = ").unwrap();

        let err = UnityConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, UnityError::Config { .. }));
    }
}
