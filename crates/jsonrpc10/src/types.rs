use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::Fault;

/// The correlation id of a JSON-RPC 1.0 message.
///
/// JSON-RPC 1.0 allows any JSON value here. A `null` id marks a notification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Value);

impl RequestId {
    pub fn null() -> Self {
        RequestId(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.0.as_i64()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<Value> for RequestId {
    fn from(value: Value) -> Self {
        RequestId(value)
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId(Value::from(n))
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        RequestId(Value::from(n))
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId(Value::from(s))
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId(Value::from(s))
    }
}

/// Call shape a procedure is willing to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsShape {
    Positional,
    Named,
    Any,
}

impl ParamsShape {
    pub fn admits(&self, params: &Params) -> bool {
        match self {
            ParamsShape::Any => true,
            ParamsShape::Positional => matches!(params, Params::Positional(_)),
            ParamsShape::Named => matches!(params, Params::Named(_)),
        }
    }
}

/// Parameters of a JSON-RPC call
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Params {
    /// Positional parameters as an array
    Positional(Vec<Value>),
    /// Named parameters as an object
    Named(Map<String, Value>),
}

impl Default for Params {
    fn default() -> Self {
        Params::Positional(Vec::new())
    }
}

impl Params {
    /// Get a parameter by name (for named params)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Params::Named(map) => map.get(key),
            Params::Positional(_) => None,
        }
    }

    /// Get a parameter by index (for positional params)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Params::Positional(vec) => vec.get(index),
            Params::Named(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::Positional(vec) => vec.len(),
            Params::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> ParamsShape {
        match self {
            Params::Positional(_) => ParamsShape::Positional,
            Params::Named(_) => ParamsShape::Named,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Params::Positional(vec) => Value::Array(vec.clone()),
            Params::Named(map) => Value::Object(map.clone()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Params::Positional(vec) => Value::Array(vec),
            Params::Named(map) => Value::Object(map),
        }
    }

    /// Deserialize the parameters into a typed argument list.
    ///
    /// Positional params map onto tuples or sequences, named params onto
    /// structs. A mismatch is reported as an invalid-parameters fault so the
    /// caller can return it with `?`.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, Fault> {
        serde_json::from_value(self.into_value())
            .map_err(|e| Fault::invalid_method_params(Some(Value::String(e.to_string()))))
    }
}

impl From<Vec<Value>> for Params {
    fn from(vec: Vec<Value>) -> Self {
        Params::Positional(vec)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Named(map)
    }
}
