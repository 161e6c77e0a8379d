//! Error types for the TCP transport and client

use jsonrpc10::{EncodeError, Fault};
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors while moving a message over a byte stream
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Message exceeds {limit} bytes")]
    MessageTooLarge { limit: usize },

    #[error("Operation timed out")]
    Timeout,
}

/// Errors surfaced by [`RpcClient`](crate::client::RpcClient)
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// The server replied with an error, or the reply was malformed
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("RPC client is not connected")]
    NotConnected,

    #[error("Server closed the connection without replying")]
    NoReply,
}

impl From<std::io::Error> for ClientError {
    fn from(error: std::io::Error) -> Self {
        ClientError::Transport(TransportError::Io(error))
    }
}

impl From<tokio::time::error::Elapsed> for ClientError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ClientError::Transport(TransportError::Timeout)
    }
}

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
