//! # JSON-RPC 1.0 over TCP
//!
//! Plain-socket transport for the [`jsonrpc10`] engine. JSON-RPC 1.0 has no
//! message framing of its own, so both sides find the end of a message by
//! matching the brackets of its top-level JSON value (see [`framing`]).
//!
//! - [`TcpServer`] accepts connections and feeds every complete message to a
//!   shared [`Dispatcher`](jsonrpc10::Dispatcher).
//! - [`RpcClient`] calls procedures on a remote server, optionally opening a
//!   fresh connection for every call.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jsonrpc10::{Dispatcher, Params};
//! use jsonrpc10_tcp::{ClientConfig, RpcClient, ServerConfig, TcpServer, TestApi};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register_collection(Arc::new(TestApi::new()), Some("test"));
//!
//! let server = TcpServer::new(ServerConfig::default(), Arc::new(dispatcher));
//! tokio::spawn(server.run(std::future::pending()));
//!
//! let mut client = RpcClient::new(ClientConfig::default().with_prefix("test."));
//! client.connect().await?;
//! let pong = client.call("ping", Params::default()).await?;
//! assert_eq!(pong, "pong");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod framing;
pub mod sample;
pub mod server;

pub use client::RpcClient;
pub use config::{ClientConfig, DEFAULT_MAX_MESSAGE_SIZE, ServerConfig};
pub use error::{ClientError, ClientResult, ConfigError, TransportError};
pub use framing::{MessageReader, is_complete_message, message_end, write_message};
pub use sample::TestApi;
pub use server::{TcpServer, handle};
