//! JSON-RPC 2.0 envelope
//!
//! Every A2A call travels as `{jsonrpc: "2.0", method, params, id}` and is
//! answered with `{jsonrpc: "2.0", result | error, id}`, where `id` echoes the
//! request's correlation id verbatim.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{A2aError, A2aResult};

/// Protocol version carried by every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard and A2A-specific JSON-RPC error codes
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const TASK_NOT_FOUND: i32 = -32001;
}

/// Correlation id of a request.
///
/// Numeric ids keep their JSON form, so fractional and unsigned 64-bit ids
/// are echoed back exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
    #[default]
    Null,
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id.into())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Null => write!(f, "null"),
        }
    }
}

/// Methods served by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum A2aMethod {
    /// `message/send`
    SendMessage,
    /// `tasks/get`
    GetTask,
}

impl A2aMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            A2aMethod::SendMessage => "message/send",
            A2aMethod::GetTask => "tasks/get",
        }
    }

    /// Resolve a wire method name
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "message/send" => Some(A2aMethod::SendMessage),
            "tasks/get" => Some(A2aMethod::GetTask),
            _ => None,
        }
    }
}

impl fmt::Display for A2aMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON-RPC request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: RequestId,
}

impl JsonRpcRequest {
    /// Build a request for `method` with serialized `params`
    pub fn new(
        method: A2aMethod,
        params: &impl Serialize,
        id: impl Into<RequestId>,
    ) -> A2aResult<Self> {
        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.as_str().to_string(),
            params: serde_json::to_value(params)?,
            id: id.into(),
        })
    }

    /// Deserialize `params` into the method's parameter type
    pub fn parse_params<T: DeserializeOwned>(&self) -> A2aResult<T> {
        serde_json::from_value(self.params.clone())
            .map_err(|e| A2aError::invalid_params(e.to_string()))
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Create a new error object
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Add data to the error object
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// JSON-RPC response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: RequestId,
}

impl JsonRpcResponse {
    /// Successful response echoing `id`
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Error response echoing `id`
    pub fn failure(id: RequestId, error: impl Into<JsonRpcError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error.into()),
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Unwrap the envelope into the typed result or the remote error
    pub fn into_result<T: DeserializeOwned>(self) -> A2aResult<T> {
        if let Some(error) = self.error {
            return Err(error.into());
        }
        let result = self
            .result
            .ok_or_else(|| A2aError::protocol_error("Response carries neither result nor error"))?;
        serde_json::from_value(result)
            .map_err(|e| A2aError::protocol_error(format!("Failed to parse result: {}", e)))
    }
}
