use serde::Serialize;
use serde_json::Value;

use crate::types::{Params, RequestId};

/// A JSON-RPC 1.0 request.
///
/// Field order matches the wire order: method, params, id. A request whose id
/// is `null` is a notification and never receives a reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: Params,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Params, id: impl Into<RequestId>) -> Self {
        Self {
            method: method.into(),
            params,
            id: id.into(),
        }
    }

    /// Create a notification (a request with a `null` id)
    pub fn notification(method: impl Into<String>, params: Params) -> Self {
        Self::new(method, params, RequestId::null())
    }

    /// Create a new request with no parameters
    pub fn new_no_params(method: impl Into<String>, id: impl Into<RequestId>) -> Self {
        Self::new(method, Params::default(), id)
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }

    /// Get a parameter by name (if params are named)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Get a parameter by index (if params are positional)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.get_index(index)
    }
}
