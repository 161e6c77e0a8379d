//! JSON-RPC 1.0 data structure / serializer.
//!
//! Translates between wire bytes and [`JsonRpcRequest`] / [`JsonRpcMessage`]
//! values. Decoding is liberal about optional fields: a missing `params`
//! becomes an empty list, and a missing `result` or `error` becomes `null`.
//! Structural problems are still rejected. A request must have exactly the
//! three fields `method`, `params` and `id`.
//!
//! JSON-RPC 1.0 does not define an error object, so the JSON-RPC 2.0 shape
//! `{"code", "message", "data"?}` is used on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::codec::{JsonCodec, SerdeJsonCodec, WireStyle};
use crate::error::{EncodeError, ErrorCode, Fault, JsonRpcError};
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, JsonRpcResponse};
use crate::types::{Params, RequestId};

/// Error code legacy servers used when a result object carried an `"error"` key.
pub const LEGACY_APPLICATION_ERROR: i64 = -10100;

/// Code and message used for error replies that do not follow the
/// `{"code", "message", "data"?}` shape.
pub const UNSTRUCTURED_ERROR_CODE: i64 = -1;
pub const UNSTRUCTURED_ERROR_MESSAGE: &str = "Error";

/// Serializer behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Accept (and emit) object-valued `params`.
    ///
    /// JSON-RPC 1.0 only defines positional params, so this is off unless a
    /// deployment opts in.
    pub accept_named_params: bool,

    /// Encode a result object that has an `"error"` key as an error reply
    /// with code [`LEGACY_APPLICATION_ERROR`].
    ///
    /// Only for peers that depend on the legacy wire format.
    pub legacy_error_results: bool,

    pub wire_style: WireStyle,
}

/// JSON-RPC 1.0 encoder/decoder over an injected [`JsonCodec`].
#[derive(Debug, Clone)]
pub struct Serializer<C = SerdeJsonCodec> {
    codec: C,
    config: SerializerConfig,
}

impl Serializer<SerdeJsonCodec> {
    pub fn new() -> Self {
        Self::from_config(SerializerConfig::default())
    }

    pub fn from_config(config: SerializerConfig) -> Self {
        Self {
            codec: SerdeJsonCodec::new(config.wire_style),
            config,
        }
    }
}

impl Default for Serializer<SerdeJsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: JsonCodec> Serializer<C> {
    pub fn with_codec(codec: C, config: SerializerConfig) -> Self {
        Self { codec, config }
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Serialize a request: `{"method": ..., "params": ..., "id": ...}`.
    ///
    /// A `null` id produces a notification.
    pub fn encode_request(
        &self,
        method: &str,
        params: &Params,
        id: &RequestId,
    ) -> Result<Vec<u8>, EncodeError> {
        if matches!(params, Params::Named(_)) && !self.config.accept_named_params {
            return Err(EncodeError::NamedParams);
        }

        self.encode(&json!({
            "method": method,
            "params": params.to_value(),
            "id": id.as_value(),
        }))
    }

    /// Serialize a notification: `{"method": ..., "params": ..., "id": null}`.
    pub fn encode_notification(&self, method: &str, params: &Params) -> Result<Vec<u8>, EncodeError> {
        self.encode_request(method, params, &RequestId::null())
    }

    /// Serialize a successful reply: `{"result": ..., "error": null, "id": ...}`.
    pub fn encode_response(&self, result: &Value, id: &RequestId) -> Result<Vec<u8>, EncodeError> {
        if self.config.legacy_error_results
            && let Some(error) = result.as_object().and_then(|object| object.get("error"))
        {
            let message = match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            let fault = Fault::new(
                LEGACY_APPLICATION_ERROR,
                message,
                Some(Value::from("Application error")),
            );
            return self.encode_error(&fault, id);
        }

        self.encode(&json!({
            "result": result,
            "error": null,
            "id": id.as_value(),
        }))
    }

    /// Serialize an error reply: `{"result": null, "error": {...}, "id": ...}`.
    ///
    /// `data` is left out of the error object when the fault has none.
    pub fn encode_error(&self, fault: &Fault, id: &RequestId) -> Result<Vec<u8>, EncodeError> {
        self.encode(&json!({
            "result": null,
            "error": fault,
            "id": id.as_value(),
        }))
    }

    /// Serialize either kind of reply
    pub fn encode_message(&self, message: &JsonRpcMessage) -> Result<Vec<u8>, EncodeError> {
        match message {
            JsonRpcMessage::Response(response) => self.encode_response(&response.result, &response.id),
            JsonRpcMessage::Error(error) => self.encode_error(&error.error, &error.id),
        }
    }

    /// De-serialize a request or notification.
    ///
    /// A notification is a request whose id is `null`; the id itself must
    /// always be present.
    pub fn decode_request(&self, bytes: &[u8]) -> Result<JsonRpcRequest, Fault> {
        let mut object = match self.decode_value(bytes)? {
            Value::Object(object) => object,
            _ => return Err(invalid_request("No valid RPC-package.")),
        };

        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            Some(_) => return Err(invalid_request(r#"Invalid Request, "method" must be a string."#)),
            None => return Err(invalid_request(r#"Invalid Request, "method" is missing."#)),
        };

        let Some(id) = object.remove("id") else {
            return Err(invalid_request(r#"Invalid Request, "id" is missing."#));
        };

        let params = match object.remove("params") {
            None => Params::default(),
            Some(Value::Array(values)) => Params::Positional(values),
            Some(Value::Object(map)) if self.config.accept_named_params => Params::Named(map),
            Some(_) => return Err(invalid_request(self.params_message())),
        };

        if !object.is_empty() {
            return Err(invalid_request("Invalid Request, additional fields found."));
        }

        Ok(JsonRpcRequest {
            method,
            params,
            id: RequestId::from(id),
        })
    }

    /// De-serialize a reply, keeping error replies as data.
    pub fn decode_reply(&self, bytes: &[u8]) -> Result<JsonRpcMessage, Fault> {
        let mut object = match self.decode_value(bytes)? {
            Value::Object(object) => object,
            _ => return Err(invalid_request("No valid RPC-package.")),
        };

        let Some(id) = object.remove("id") else {
            return Err(invalid_request(r#"Invalid Response, "id" missing."#));
        };
        let result = object.remove("result").unwrap_or(Value::Null);
        let error = object.remove("error").unwrap_or(Value::Null);

        if !object.is_empty() {
            return Err(invalid_request("Invalid Response, additional or missing fields."));
        }

        let id = RequestId::from(id);
        if error.is_null() {
            return Ok(JsonRpcMessage::Response(JsonRpcResponse { result, id }));
        }
        if !result.is_null() {
            return Err(invalid_request(
                r#"Invalid Response, one of "result" or "error" must be null."#,
            ));
        }

        Ok(JsonRpcMessage::Error(JsonRpcError::new(fault_from_wire(error), id)))
    }

    /// De-serialize a reply, returning the result or the fault the peer sent.
    pub fn decode_response(&self, bytes: &[u8]) -> Result<JsonRpcResponse, Fault> {
        match self.decode_reply(bytes)? {
            JsonRpcMessage::Response(response) => Ok(response),
            JsonRpcMessage::Error(error) => Err(error.error),
        }
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, Fault> {
        self.codec
            .decode(bytes)
            .map_err(|e| Fault::parse_error(Some(Value::String(format!("No valid JSON. ({})", e)))))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        Ok(self.codec.encode(value)?)
    }

    fn params_message(&self) -> &'static str {
        if self.config.accept_named_params {
            r#"Invalid Request, "params" must be an array or object."#
        } else {
            r#"Invalid Request, "params" must be an array."#
        }
    }
}

fn invalid_request(detail: &str) -> Fault {
    Fault::invalid_request(Some(Value::from(detail)))
}

/// Map a received error object onto a [`Fault`].
fn fault_from_wire(error: Value) -> Fault {
    match structured_error(&error) {
        Some((code, message, data)) => match ErrorCode::from_code(code) {
            Some(known) => Fault::from_code(known, data),
            None => Fault::new(code, message, data),
        },
        None => Fault::new(UNSTRUCTURED_ERROR_CODE, UNSTRUCTURED_ERROR_MESSAGE, Some(error)),
    }
}

/// `(code, message, data)` if the value has the 2-or-3-field error shape.
fn structured_error(error: &Value) -> Option<(i64, String, Option<Value>)> {
    let object: &Map<String, Value> = error.as_object()?;
    let shaped = match object.len() {
        2 => true,
        3 => object.contains_key("data"),
        _ => false,
    };
    if !shaped {
        return None;
    }

    let code = object.get("code")?.as_i64()?;
    let message = object.get("message")?.as_str()?.to_string();
    let data = object.get("data").filter(|data| !data.is_null()).cloned();
    Some((code, message, data))
}
