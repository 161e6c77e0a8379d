//! Configuration types for the TCP server and client

use jsonrpc10::SerializerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Largest message either side will buffer by default
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,

    /// Largest request accepted, in bytes
    pub max_message_size: usize,

    /// How long a connection may stay silent before it is closed
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Wire behaviour of the serializer
    pub serializer: SerializerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            read_timeout: Duration::from_secs(30),
            serializer: SerializerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_size == 0 {
            return Err(ConfigError::Invalid("max_message_size must be positive".into()));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::Invalid("read_timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,

    pub port: u16,

    /// Prepended to every method name, e.g. `"test."`
    pub prefix: String,

    /// Open and close a connection around every call
    pub reconnect: bool,

    /// Bound on connect, write and read
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    pub max_message_size: usize,

    pub serializer: SerializerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            prefix: String::new(),
            reconnect: false,
            timeout: Duration::from_secs(1),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            serializer: SerializerConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
