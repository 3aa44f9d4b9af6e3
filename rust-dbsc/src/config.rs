//! Protocol configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreConfig;
use crate::SUPPORTED_ALGORITHMS;

/// How the session guard treats the bootstrap cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Cookie must be present (browsers drop it when Max-Age elapses)
    #[default]
    Presence,
    /// Cookie must also name a live bootstrap cookie in the store
    Live,
}

/// DBSC protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbscConfig {
    /// Registration endpoint advertised in `Sec-Session-Registration`
    pub registration_path: String,

    /// Refresh endpoint advertised in the session instruction
    pub refresh_path: String,

    /// Name of the bootstrap cookie
    pub cookie_name: String,

    /// Proof algorithms advertised and accepted, in preference order
    pub algorithms: Vec<String>,

    /// Challenge lifetime (default: 60 s)
    pub challenge_ttl_secs: u64,

    /// Bootstrap cookie lifetime after registration (default: 10 s)
    pub registration_cookie_ttl_secs: u64,

    /// Bootstrap cookie lifetime after refresh (default: 60 s)
    pub refresh_cookie_ttl_secs: u64,

    /// Session lifetime (default: 30 days)
    pub session_ttl_secs: u64,

    /// Treat every request as arriving over TLS
    pub secure_transport: bool,

    /// Honor `X-Forwarded-Proto` from a TLS-terminating proxy
    pub trust_forwarded_proto: bool,

    /// Remove a challenge the first time a proof redeems it
    pub single_use_challenges: bool,

    /// Guard strictness
    pub guard_mode: GuardMode,

    /// Optional `authorization` parameter for the registration header
    pub authorization: Option<String>,
}

impl Default for DbscConfig {
    fn default() -> Self {
        Self {
            registration_path: "/dbsc_start".to_string(),
            refresh_path: "/dbsc_refresh".to_string(),
            cookie_name: "dbsc_cookie".to_string(),
            algorithms: SUPPORTED_ALGORITHMS.iter().map(|a| a.to_string()).collect(),
            challenge_ttl_secs: 60,
            registration_cookie_ttl_secs: 10,
            refresh_cookie_ttl_secs: 60,
            session_ttl_secs: 30 * 24 * 60 * 60,
            secure_transport: false,
            trust_forwarded_proto: false,
            single_use_challenges: false,
            guard_mode: GuardMode::Presence,
            authorization: None,
        }
    }
}

impl DbscConfig {
    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }

    pub fn registration_cookie_ttl(&self) -> Duration {
        Duration::from_secs(self.registration_cookie_ttl_secs)
    }

    pub fn refresh_cookie_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_cookie_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Store settings derived from this configuration
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            challenge_ttl: self.challenge_ttl(),
            session_ttl: self.session_ttl(),
            single_use_challenges: self.single_use_challenges,
            ..StoreConfig::default()
        }
    }

    /// Check values that end up in headers and cookies.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, path) in [
            ("registration_path", &self.registration_path),
            ("refresh_path", &self.refresh_path),
        ] {
            if !path.starts_with('/') || !is_printable_ascii(path) {
                return Err(ConfigError::InvalidPath {
                    field,
                    value: path.clone(),
                });
            }
        }

        if self.cookie_name.is_empty() || !self.cookie_name.chars().all(is_token_char) {
            return Err(ConfigError::InvalidCookieName(self.cookie_name.clone()));
        }

        if self.algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }
        if let Some(alg) = self
            .algorithms
            .iter()
            .find(|alg| !SUPPORTED_ALGORITHMS.contains(&alg.as_str()))
        {
            return Err(ConfigError::UnsupportedAlgorithm(alg.clone()));
        }

        for (field, secs) in [
            ("challenge_ttl_secs", self.challenge_ttl_secs),
            ("registration_cookie_ttl_secs", self.registration_cookie_ttl_secs),
            ("refresh_cookie_ttl_secs", self.refresh_cookie_ttl_secs),
            ("session_ttl_secs", self.session_ttl_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ZeroTtl(field));
            }
        }

        if let Some(authorization) = &self.authorization {
            if !is_printable_ascii(authorization) {
                return Err(ConfigError::NonPrintable("authorization"));
            }
        }

        Ok(())
    }
}

/// Invalid protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be an absolute path of printable ASCII, got {value:?}")]
    InvalidPath { field: &'static str, value: String },

    #[error("Invalid cookie name: {0:?}")]
    InvalidCookieName(String),

    #[error("No proof algorithms configured")]
    NoAlgorithms,

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("{0} must be greater than zero")]
    ZeroTtl(&'static str),

    #[error("{0} must contain only printable ASCII")]
    NonPrintable(&'static str),
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

/// RFC 7230 token characters, as required for cookie names
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}
