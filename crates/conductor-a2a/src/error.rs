//! A2A Protocol Error Types
//!
//! This module defines error types for the A2A protocol implementation and
//! their mapping onto JSON-RPC error objects.

use thiserror::Error;

use crate::jsonrpc::{JsonRpcError, codes};

/// Result type for A2A operations
pub type A2aResult<T> = Result<T, A2aError>;

/// Errors that can occur in A2A protocol operations
#[derive(Debug, Error)]
pub enum A2aError {
    /// Request body was not valid JSON
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Request was valid JSON but not a valid JSON-RPC request
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Method is not one this agent serves
    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    /// Parameters did not match the method's schema
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    /// Message validation failed
    #[error("Invalid message: {reason}")]
    InvalidMessage { reason: String },

    /// Task not found
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    /// Invalid task state transition
    #[error("Invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        task_id: String,
        from: String,
        to: String,
    },

    /// Execution queue no longer has a consumer
    #[error("Execution queue closed")]
    QueueClosed,

    /// Connection error
    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    /// Request timeout
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Remote agent answered with a JSON-RPC error object
    #[error("Remote error {code}: {message}")]
    Remote { code: i32, message: String },

    /// Protocol error
    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP error (when client feature is enabled)
    #[cfg(feature = "client")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Storage backend I/O error
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl A2aError {
    /// Create a task not found error
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    /// Create an invalid message error
    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            reason: reason.into(),
        }
    }

    /// Create an invalid params error
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create a method not found error
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create a connection error
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            A2aError::ConnectionError { .. } | A2aError::Timeout { .. } => true,
            #[cfg(feature = "client")]
            A2aError::HttpError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        match self {
            A2aError::ParseError { .. } => codes::PARSE_ERROR,
            A2aError::InvalidRequest { .. } => codes::INVALID_REQUEST,
            A2aError::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            A2aError::InvalidParams { .. } | A2aError::InvalidMessage { .. } => {
                codes::INVALID_PARAMS
            }
            A2aError::TaskNotFound { .. } => codes::TASK_NOT_FOUND,
            A2aError::Remote { code, .. } => *code,
            _ => codes::INTERNAL_ERROR,
        }
    }
}

impl From<A2aError> for JsonRpcError {
    fn from(err: A2aError) -> Self {
        JsonRpcError::new(err.code(), err.to_string())
    }
}

impl From<JsonRpcError> for A2aError {
    fn from(err: JsonRpcError) -> Self {
        A2aError::Remote {
            code: err.code,
            message: err.message,
        }
    }
}
