//! Message boundaries on a byte stream.
//!
//! JSON-RPC 1.0 does not frame messages, so a message ends where its
//! top-level JSON object or array closes. Brackets inside string literals
//! (including escaped quotes) do not count.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransportError;

const READ_CHUNK: usize = 4096;

/// Length of the first complete message in `buf`, if there is one.
///
/// Leading whitespace belongs to the message. A buffer that does not start
/// with `{` or `[` cannot be framed, so everything received so far is
/// returned as one (malformed) message and left for the decoder to reject.
pub fn message_end(buf: &[u8]) -> Option<usize> {
    let start = buf.iter().position(|b| !b.is_ascii_whitespace())?;
    if !matches!(buf[start], b'{' | b'[') {
        return Some(buf.len());
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in buf[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

pub fn is_complete_message(buf: &[u8]) -> bool {
    message_end(buf).is_some()
}

/// Reads whole messages from a stream, keeping any bytes that arrive after
/// a message for the next call.
pub struct MessageReader<R> {
    inner: R,
    buffer: Vec<u8>,
    max_size: usize,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(inner: R, max_size: usize) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            max_size,
        }
    }

    /// Read the next complete message.
    ///
    /// Returns `Ok(None)` on EOF when nothing but whitespace is pending. An
    /// incomplete message pending at EOF is returned as is, for the decoder
    /// to reject.
    pub async fn next_message(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(end) = message_end(&self.buffer) {
                if end > self.max_size {
                    return Err(TransportError::MessageTooLarge { limit: self.max_size });
                }
                let rest = self.buffer.split_off(end);
                return Ok(Some(std::mem::replace(&mut self.buffer, rest)));
            }
            if self.buffer.len() > self.max_size {
                return Err(TransportError::MessageTooLarge { limit: self.max_size });
            }

            let read = self.inner.read(&mut chunk).await?;
            if read == 0 {
                let pending = std::mem::take(&mut self.buffer);
                if pending.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                return Ok(Some(pending));
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }
}

/// Write one message and flush it.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &[u8]) -> std::io::Result<()> {
    writer.write_all(message).await?;
    writer.flush().await
}
