//! Pluggable JSON encode/decode primitives used by the [`Serializer`].
//!
//! [`Serializer`]: crate::serializer::Serializer

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;

use crate::error::CodecError;

/// JSON encode/decode primitives.
pub trait JsonCodec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// Whitespace layout of encoded messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireStyle {
    /// `", "` between items and `": "` after keys, at every nesting level.
    /// This is the layout legacy peers emit and diff against.
    #[default]
    Spaced,
    /// No insignificant whitespace.
    Compact,
}

/// [`JsonCodec`] backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonCodec {
    pub style: WireStyle,
}

impl SerdeJsonCodec {
    pub fn new(style: WireStyle) -> Self {
        Self { style }
    }
}

impl JsonCodec for SerdeJsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        match self.style {
            WireStyle::Compact => Ok(serde_json::to_vec(value)?),
            WireStyle::Spaced => {
                let mut ser = serde_json::Serializer::with_formatter(Vec::new(), SpacedFormatter);
                value.serialize(&mut ser)?;
                Ok(ser.into_inner())
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
