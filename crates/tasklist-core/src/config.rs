//! Tasklist Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Token issuance and verification
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Users created in the in-memory store at startup
    pub seed_users: Vec<SeedUser>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Load the file named by `TASKLIST_CONFIG` if set, then apply env overrides
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("TASKLIST_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_env_override()
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = parse_var("API_PORT", port)?;
        }

        // Auth
        if let Ok(issuer) = std::env::var("TOKEN_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Ok(path) = std::env::var("PRIVATE_KEY_PATH") {
            self.auth.private_key_path = PathBuf::from(path);
        }
        if let Ok(ttl) = std::env::var("TOKEN_TTL_SECS") {
            self.auth.token_ttl_secs = parse_var("TOKEN_TTL_SECS", ttl)?;
        }
        if let Ok(flag) = std::env::var("TOKEN_VALIDATE_ISSUER") {
            self.auth.validate_issuer = parse_var("TOKEN_VALIDATE_ISSUER", flag)?;
        }

        // CORS origins from environment variable (comma-separated)
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Bearer token settings
///
/// `issuer` and `private_key_path` have no usable default; an empty value
/// makes token authority construction fail at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer embedded in every token
    pub issuer: String,

    /// PEM-encoded RSA private key
    pub private_key_path: PathBuf,

    /// Token lifetime in seconds
    pub token_ttl_secs: i64,

    /// Reject tokens whose `iss` claim differs from `issuer`
    pub validate_issuer: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            private_key_path: PathBuf::new(),
            token_ttl_secs: 3600, // 1 hour
            validate_issuer: false,
        }
    }
}

impl AuthConfig {
    /// Token lifetime as a signed duration
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// A user account to create at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    /// Fixed user id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
