use serde_json::Value;

use crate::error::{Fault, JsonRpcError};
use crate::types::RequestId;

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub result: Value,
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn new(result: Value, id: impl Into<RequestId>) -> Self {
        Self {
            result,
            id: id.into(),
        }
    }
}

/// Either a successful response or an error response.
///
/// Exactly one of result and error is carried, so the two cases are kept as
/// separate variants rather than a pair of nullable fields.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn success(result: Value, id: impl Into<RequestId>) -> Self {
        Self::Response(JsonRpcResponse::new(result, id))
    }

    pub fn error(error: Fault, id: impl Into<RequestId>) -> Self {
        Self::Error(JsonRpcError::new(error, id.into()))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the id from either response or error
    pub fn id(&self) -> &RequestId {
        match self {
            JsonRpcMessage::Response(resp) => &resp.id,
            JsonRpcMessage::Error(err) => &err.id,
        }
    }

    /// Unwrap into the result value, or the fault the peer sent
    pub fn into_result(self) -> Result<Value, Fault> {
        match self {
            JsonRpcMessage::Response(resp) => Ok(resp.result),
            JsonRpcMessage::Error(err) => Err(err.error),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}
