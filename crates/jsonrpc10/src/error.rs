use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::types::RequestId;

/// JSON-RPC error codes understood by this engine.
///
/// The first five are the JSON-RPC 2.0 protocol codes; the remaining four are
/// application codes in the server-error range that procedures raise to
/// signal well-known failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidMethodParams,
    InternalError,
    ProcedureException,
    AuthenticationError,
    PermissionDenied,
    InvalidParamValues,
}

impl ErrorCode {
    /// Every known code, in table order.
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::ParseError,
        ErrorCode::InvalidRequest,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidMethodParams,
        ErrorCode::InternalError,
        ErrorCode::ProcedureException,
        ErrorCode::AuthenticationError,
        ErrorCode::PermissionDenied,
        ErrorCode::InvalidParamValues,
    ];

    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidMethodParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ProcedureException => -32000,
            ErrorCode::AuthenticationError => -32001,
            ErrorCode::PermissionDenied => -32002,
            ErrorCode::InvalidParamValues => -32003,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error.",
            ErrorCode::InvalidRequest => "Invalid Request.",
            ErrorCode::MethodNotFound => "Method not found.",
            ErrorCode::InvalidMethodParams => "Invalid parameters.",
            ErrorCode::InternalError => "Internal error.",
            ErrorCode::ProcedureException => "Procedure exception.",
            ErrorCode::AuthenticationError => "Authentication error.",
            ErrorCode::PermissionDenied => "Permission denied.",
            ErrorCode::InvalidParamValues => "Invalid parameter values.",
        }
    }

    /// Look up a known code by exact integer equality.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|known| known.code() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// A structured RPC-level error: code, message and optional data.
///
/// Faults are both the wire error object and the failure value a procedure
/// returns when it wants the client to see a specific error. They are never
/// mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("JSON-RPC fault {code}: {message}")]
pub struct Fault {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Fault {
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Build a fault for a known code using its canonical message.
    pub fn from_code(code: ErrorCode, data: Option<Value>) -> Self {
        Self::new(code.code(), code.message(), data)
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::ParseError, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::InvalidRequest, data)
    }

    pub fn method_not_found(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::MethodNotFound, data)
    }

    pub fn invalid_method_params(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::InvalidMethodParams, data)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::InternalError, data)
    }

    pub fn procedure_exception(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::ProcedureException, data)
    }

    pub fn authentication_error(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::AuthenticationError, data)
    }

    pub fn permission_denied(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::PermissionDenied, data)
    }

    pub fn invalid_param_values(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::InvalidParamValues, data)
    }

    /// The known code this fault carries, if any.
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code.code()
    }
}

/// An error reply: the fault plus the id it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    pub error: Fault,
    pub id: RequestId,
}

impl JsonRpcError {
    pub fn new(error: Fault, id: RequestId) -> Self {
        Self { error, id }
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {} (id {})",
            self.error.code, self.error.message, self.id
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Failure returned by a procedure.
///
/// `Fault` is part of the procedure's documented contract and reaches the
/// client verbatim. `Failed` is anything else: it is logged in full and the
/// client only sees a bare internal error.
#[derive(Debug, Error)]
pub enum ProcedureError {
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("procedure failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ProcedureError {
    pub fn failed(error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        ProcedureError::Failed(error.into())
    }
}

impl From<anyhow::Error> for ProcedureError {
    fn from(error: anyhow::Error) -> Self {
        ProcedureError::Failed(error.into())
    }
}

impl From<serde_json::Error> for ProcedureError {
    fn from(error: serde_json::Error) -> Self {
        ProcedureError::Failed(Box::new(error))
    }
}

/// Failure of the injected JSON encode/decode primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

impl From<serde_json::Error> for CodecError {
    fn from(error: serde_json::Error) -> Self {
        CodecError(error.to_string())
    }
}

/// Errors raised while encoding an outgoing message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("params must be an ordered sequence")]
    NamedParams,

    #[error("JSON encoding failed: {0}")]
    Codec(#[from] CodecError),
}
