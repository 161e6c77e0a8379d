//! TCP accept loop around a [`Dispatcher`]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jsonrpc10::dispatch::FALLBACK_INTERNAL_ERROR;
use jsonrpc10::{Dispatcher, JsonCodec, SerdeJsonCodec};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::TransportError;
use crate::framing::{MessageReader, write_message};

/// Run one complete message through the dispatcher.
///
/// Returns the bytes to write back verbatim, or `None` when nothing must be
/// written.
pub fn handle<C: JsonCodec>(dispatcher: &Dispatcher<C>, raw: &[u8]) -> Option<Vec<u8>> {
    debug!(request = %String::from_utf8_lossy(raw), "Request");
    let reply = dispatcher.dispatch(raw);
    match &reply {
        Some(bytes) => debug!(reply = %String::from_utf8_lossy(bytes), "Reply"),
        None => debug!("No reply"),
    }
    reply
}

/// JSON-RPC server over plain TCP.
///
/// Each connection carries a sequence of exchanges: one message in, at most
/// one message out. The connection ends at EOF, after `read_timeout` of
/// silence, or on a framing error.
pub struct TcpServer<C = SerdeJsonCodec> {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher<C>>,
}

impl<C: JsonCodec + 'static> TcpServer<C> {
    pub fn new(config: ServerConfig, dispatcher: Arc<Dispatcher<C>>) -> Self {
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.config.bind).await
    }

    /// Accept connections until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(addr = %listener.local_addr()?, "JSON-RPC server listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("JSON-RPC server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                }
            }
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let max_size = self.config.max_message_size;
        let read_timeout = self.config.read_timeout;

        tokio::spawn(async move {
            debug!(peer = %peer, "Connection opened");
            match serve_connection(stream, dispatcher, max_size, read_timeout).await {
                Ok(()) => debug!(peer = %peer, "Connection closed"),
                Err(e) => warn!(peer = %peer, error = %e, "Connection aborted"),
            }
        });
    }
}

async fn serve_connection<C: JsonCodec + 'static>(
    stream: TcpStream,
    dispatcher: Arc<Dispatcher<C>>,
    max_size: usize,
    read_timeout: Duration,
) -> Result<(), TransportError> {
    let (reader, mut writer) = stream.into_split();
    let mut messages = MessageReader::new(reader, max_size);

    loop {
        let Ok(next) = timeout(read_timeout, messages.next_message()).await else {
            debug!("Connection idle, closing");
            return Ok(());
        };
        let Some(raw) = next? else {
            return Ok(());
        };

        // procedures are synchronous and may block
        let dispatcher = Arc::clone(&dispatcher);
        let reply = match tokio::task::spawn_blocking(move || handle(&dispatcher, &raw)).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Dispatch task failed");
                Some(FALLBACK_INTERNAL_ERROR.to_vec())
            }
        };

        if let Some(bytes) = reply {
            write_message(&mut writer, &bytes).await?;
        }
    }
}
