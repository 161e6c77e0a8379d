//! # JSON-RPC 1.0 Protocol Engine
//!
//! A transport-agnostic JSON-RPC 1.0 implementation in two layers:
//!
//! - [`Serializer`]: pure encode/decode between wire bytes and requests,
//!   responses and faults, over a pluggable [`JsonCodec`].
//! - [`Dispatcher`]: a table of named procedures plus the request/response
//!   cycle that decodes a message, invokes the procedure and encodes its
//!   result or fault.
//!
//! The transport hands a complete message to [`Dispatcher::dispatch`] and
//! writes back whatever bytes it returns. Notifications (requests whose id is
//! `null`) never produce a reply.
//!
//! ```rust
//! use jsonrpc10::prelude::*;
//! use serde_json::json;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(FunctionProcedure::positional("add", |params: Params| {
//!     let (a, b): (i64, i64) = params.parse()?;
//!     Ok(json!(a + b))
//! }));
//!
//! let reply = dispatcher
//!     .dispatch(br#"{"method": "add", "params": [7, 8], "id": 1}"#)
//!     .unwrap();
//! assert_eq!(reply, br#"{"result": 15, "error": null, "id": 1}"#);
//! ```
//!
//! ## Error handling
//! Faults raised by a procedure are part of its contract and reach the client
//! unchanged. Any other failure is logged through `tracing` and replaced by a
//! bare internal error, so no internal detail reaches the wire.

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod request;
pub mod response;
pub mod serializer;
pub mod types;

// Re-export main types
pub use codec::{JsonCodec, SerdeJsonCodec, WireStyle};
pub use dispatch::{Dispatcher, FunctionProcedure, Procedure, ProcedureCollection, ProcedureTable, procedure};
pub use error::{CodecError, EncodeError, ErrorCode, Fault, JsonRpcError, ProcedureError};
pub use request::JsonRpcRequest;
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use serializer::{Serializer, SerializerConfig};
pub use types::{Params, ParamsShape, RequestId};
