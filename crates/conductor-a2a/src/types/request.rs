//! Method parameter types for the A2A JSON-RPC methods.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Message;

/// Parameters of `message/send`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    /// The message to send
    pub message: Message,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MessageSendParams {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            metadata: HashMap::new(),
        }
    }
}

/// Parameters of `tasks/get`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    /// Task ID
    pub id: String,

    /// Return at most this many of the newest history entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
}

impl TaskQueryParams {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history_length: None,
        }
    }
}
