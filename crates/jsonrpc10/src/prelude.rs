//! # JSON-RPC 1.0 Prelude
//!
//! Convenient re-exports of the most commonly used types.
//!
//! ```rust
//! use jsonrpc10::prelude::*;
//! ```

pub use crate::codec::{JsonCodec, SerdeJsonCodec, WireStyle};
pub use crate::dispatch::{
    Dispatcher, FunctionProcedure, Procedure, ProcedureCollection, ProcedureTable, procedure,
};
pub use crate::error::{ErrorCode, Fault, ProcedureError};
pub use crate::request::JsonRpcRequest;
pub use crate::response::{JsonRpcMessage, JsonRpcResponse};
pub use crate::serializer::{Serializer, SerializerConfig};
pub use crate::types::{Params, ParamsShape, RequestId};
