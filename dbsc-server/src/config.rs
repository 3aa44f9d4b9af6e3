//! Configuration management for the demo server

use dbsc::DbscConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Demo login settings
    #[serde(default)]
    pub demo: DemoConfig,

    /// DBSC protocol settings
    #[serde(default)]
    pub dbsc: DbscConfig,
}

/// Placeholder username/password login that starts registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_demo_credential")]
    pub username: String,

    #[serde(default = "default_demo_credential")]
    pub password: String,

    /// Login cookie lifetime (default: 5 minutes)
    #[serde(default = "default_login_ttl_secs")]
    pub login_ttl_secs: u64,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_demo_credential() -> String {
    "test".to_string()
}

fn default_login_ttl_secs() -> u64 {
    300
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            username: default_demo_credential(),
            password: default_demo_credential(),
            login_ttl_secs: default_login_ttl_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            demo: DemoConfig::default(),
            dbsc: DbscConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from a variable lookup, defaulting unset values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(listen) = lookup("DBSC_LISTEN") {
            config.listen = listen;
        }

        if let Some(value) = lookup("DBSC_SECURE_TRANSPORT") {
            config.dbsc.secure_transport = parse_bool(&value).ok_or(ConfigError::InvalidEnvVar {
                name: "DBSC_SECURE_TRANSPORT",
                value,
            })?;
        }

        if let Some(value) = lookup("DBSC_TRUST_FORWARDED_PROTO") {
            config.dbsc.trust_forwarded_proto =
                parse_bool(&value).ok_or(ConfigError::InvalidEnvVar {
                    name: "DBSC_TRUST_FORWARDED_PROTO",
                    value,
                })?;
        }

        if let Some(username) = lookup("DBSC_DEMO_USER") {
            config.demo.username = username;
        }

        if let Some(password) = lookup("DBSC_DEMO_PASSWORD") {
            config.demo.password = password;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("~/.config"));
        config_dir.join("dbsc-server").join("config.yaml")
    }

    /// Load from default locations (file first, then env)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            Self::from_env()
        }
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|_| ConfigError::InvalidListen(self.listen.clone()))
    }

    /// Check every value before serving
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.demo.username.is_empty() || self.demo.password.is_empty() {
            return Err(ConfigError::EmptyCredential);
        }
        self.dbsc.validate()?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnvVar { name: &'static str, value: String },
    #[error("Invalid listen address: {0}")]
    InvalidListen(String),
    #[error("Demo username and password must not be empty")]
    EmptyCredential,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Dbsc(#[from] dbsc::ConfigError),
}
