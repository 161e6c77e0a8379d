//! JSON-RPC 1.0 client over TCP

use jsonrpc10::{Params, RequestId, Serializer};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::framing::{MessageReader, write_message};

struct Connection {
    reader: MessageReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Calls procedures on a remote JSON-RPC 1.0 server.
///
/// With `reconnect` set, every call opens its own connection and closes it
/// afterwards. Otherwise [`connect`](Self::connect) must be called first and
/// the connection is reused.
pub struct RpcClient {
    config: ClientConfig,
    serializer: Serializer,
    connection: Option<Connection>,
    next_id: u64,
}

impl RpcClient {
    pub fn new(config: ClientConfig) -> Self {
        let serializer = Serializer::from_config(config.serializer.clone());
        Self {
            config,
            serializer,
            connection: None,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub async fn connect(&mut self) -> ClientResult<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let address = (self.config.host.as_str(), self.config.port);
        let stream = timeout(self.config.timeout, TcpStream::connect(address)).await??;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        debug!(host = %self.config.host, port = self.config.port, "Connected");
        self.connection = Some(Connection {
            reader: MessageReader::new(reader, self.config.max_message_size),
            writer,
        });
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            debug!(host = %self.config.host, port = self.config.port, "Disconnected");
        }
    }

    /// Call `prefix + name` and wait for its result.
    ///
    /// An error reply from the server is returned as [`ClientError::Fault`].
    pub async fn call(&mut self, name: &str, params: Params) -> ClientResult<Value> {
        let id = RequestId::from(self.next_id);
        self.next_id += 1;

        let method = self.method_name(name);
        let request = self.serializer.encode_request(&method, &params, &id)?;
        debug!(method = %method, id = %id, "Calling");

        self.open().await?;
        let reply = self.exchange(request).await;
        self.close(reply.is_err());

        let response = self.serializer.decode_response(&reply?)?;
        if response.id != id {
            warn!(expected = %id, actual = %response.id, "Reply id does not match request");
        }
        Ok(response.result)
    }

    /// Send a notification; no reply is read.
    pub async fn notify(&mut self, name: &str, params: Params) -> ClientResult<()> {
        let method = self.method_name(name);
        let request = self.serializer.encode_notification(&method, &params)?;
        debug!(method = %method, "Notifying");

        self.open().await?;
        let sent = self.send(request).await;
        self.close(sent.is_err());
        sent
    }

    fn method_name(&self, name: &str) -> String {
        format!("{}{}", self.config.prefix, name)
    }

    async fn open(&mut self) -> ClientResult<()> {
        if self.config.reconnect {
            self.connect().await
        } else if self.connection.is_none() {
            Err(ClientError::NotConnected)
        } else {
            Ok(())
        }
    }

    // a failed exchange leaves the stream in an unknown state
    fn close(&mut self, failed: bool) {
        if self.config.reconnect || failed {
            self.disconnect();
        }
    }

    async fn send(&mut self, request: Vec<u8>) -> ClientResult<()> {
        let limit = self.config.timeout;
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        timeout(limit, write_message(&mut connection.writer, &request)).await??;
        Ok(())
    }

    async fn exchange(&mut self, request: Vec<u8>) -> ClientResult<Vec<u8>> {
        self.send(request).await?;

        let limit = self.config.timeout;
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        timeout(limit, connection.reader.next_message())
            .await??
            .ok_or(ClientError::NoReply)
    }
}
