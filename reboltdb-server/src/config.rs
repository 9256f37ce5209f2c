//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via REBOLTDB_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("REBOLTDB_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.auth.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.storage.apply_env_overrides();
        self.auth.apply_env_overrides();
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Timeout for each handshake phase, in seconds.
    pub handshake_timeout_secs: u64,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], reboltdb_protocol::DEFAULT_PORT)),
            handshake_timeout_secs: 10,
            max_connections: 1024,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("REBOLTDB_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("REBOLTDB_HANDSHAKE_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.handshake_timeout_secs = secs;
            }
        }

        if let Ok(max) = std::env::var("REBOLTDB_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }
    }

    /// Returns the handshake timeout as a Duration.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".boltdb"),
        }
    }
}

impl StorageConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("REBOLTDB_DATA") {
            self.path = PathBuf::from(path);
        }
    }
}

/// Authentication configuration.
///
/// The defaults are the built-in administrator credentials; a deployment
/// overrides them at startup. `password_hash` is the base64 of the 32-byte
/// PBKDF2-HMAC-SHA256 salted password, so the plaintext password is never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// The only recognized username.
    pub username: String,
    /// Base64 salt sent to clients in the SCRAM challenge.
    pub password_salt: String,
    /// Base64 of the salted password (32 bytes).
    pub password_hash: String,
    /// PBKDF2 iteration count advertised to clients.
    pub iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password_salt: "6VRzcOVKuS8WWbOKM5Vurw==".to_string(),
            password_hash: "NsWJkSBxXNSiI1Bh0UWM7UXAE3fId5RR1ZnA7Cldtws=".to_string(),
            iterations: 4096,
        }
    }
}

impl AuthConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(username) = std::env::var("REBOLTDB_AUTH_USERNAME") {
            if !username.is_empty() {
                self.username = username;
            }
        }
        if let Ok(salt) = std::env::var("REBOLTDB_AUTH_SALT") {
            if !salt.is_empty() {
                self.password_salt = salt;
            }
        }
        if let Ok(hash) = std::env::var("REBOLTDB_AUTH_PASSWORD_HASH") {
            if !hash.is_empty() {
                self.password_hash = hash;
            }
        }
        if let Ok(iterations) = std::env::var("REBOLTDB_AUTH_ITERATIONS") {
            if let Ok(n) = iterations.parse() {
                self.iterations = n;
            }
        }
    }

    /// Validates that the stored hash decodes to the 32 bytes SCRAM-SHA-256
    /// requires.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let decoded = STANDARD.decode(&self.password_hash).map_err(|e| {
            ConfigError::ValidationError(format!("auth.password_hash is not valid base64: {e}"))
        })?;
        if decoded.len() != 32 {
            return Err(ConfigError::ValidationError(format!(
                "auth.password_hash must decode to 32 bytes, got {}",
                decoded.len()
            )));
        }
        if self.username.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.username must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Custom serde module for SocketAddr (to handle as string in YAML).
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
