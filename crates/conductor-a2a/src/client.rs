//! A2A Protocol Client
//!
//! HTTP client for talking to a Conductor agent's JSON-RPC endpoint.
//!
//! # Overview
//!
//! The [`A2aClient`] wraps one agent endpoint and handles:
//!
//! - **Message Sending**: `message/send`, which returns as soon as the task
//!   is submitted
//! - **Task Polling**: `tasks/get`, plus [`A2aClient::wait_for_task`] which
//!   polls until the task is terminal or a deadline passes
//! - **Agent Discovery**: the agent card at `.well-known/agent.json`
//!
//! Every call carries a fresh correlation id, and a response whose id does not
//! echo it is rejected as a protocol error.
//!
//! # Timeouts
//!
//! | Operation | Default Timeout | Notes |
//! |-----------|-----------------|-------|
//! | Single HTTP call | 30 seconds | Override with [`A2aClient::with_timeout`] |
//! | `wait_for_task` | caller supplied | Bounds the whole polling loop |
//!
//! The client is `Clone`-able and shares its connection pool across clones.
//!
//! # Example
//!
//! ```rust,no_run
//! use conductor_a2a::client::A2aClient;
//! use std::time::Duration;
//!
//! # async fn run() -> conductor_a2a::A2aResult<()> {
//! let client = A2aClient::new("http://localhost:8000/summarizer/")?;
//! let task = client.send_text("A long text to summarize").await?;
//! let done = client
//!     .wait_for_task(&task.id, Duration::from_millis(300), Duration::from_secs(9))
//!     .await?;
//! println!("{:?}", done.last_agent_text());
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{A2aError, A2aResult};
use crate::jsonrpc::{A2aMethod, JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::types::{AgentCard, Message, MessageSendParams, Task, TaskQueryParams};

/// Default timeout for HTTP requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC client bound to a single agent endpoint
#[derive(Clone)]
pub struct A2aClient {
    endpoint: Url,
    http: Client,
}

impl std::fmt::Debug for A2aClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("A2aClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl A2aClient {
    /// Create a client for the agent at `endpoint` with the default timeout
    pub fn new(endpoint: impl AsRef<str>) -> A2aResult<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a client whose individual HTTP calls time out after `timeout`
    pub fn with_timeout(endpoint: impl AsRef<str>, timeout: Duration) -> A2aResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("conductor-a2a/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                A2aError::connection_error(format!("Failed to create HTTP client: {}", e))
            })?;

        Self::with_http_client(endpoint, http)
    }

    /// Create a client with a custom HTTP client
    pub fn with_http_client(endpoint: impl AsRef<str>, http: Client) -> A2aResult<Self> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self { endpoint, http })
    }

    /// The JSON-RPC endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// URL of the agent card, relative to the endpoint directory
    fn card_url(&self) -> A2aResult<Url> {
        let mut base = self.endpoint.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(".well-known/agent.json")
            .map_err(|e| A2aError::protocol_error(format!("Invalid endpoint path: {}", e)))
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Send a message; returns the submitted task without waiting for it
    pub async fn send_message(&self, message: Message) -> A2aResult<Task> {
        self.call(A2aMethod::SendMessage, &MessageSendParams::new(message))
            .await
    }

    /// Send a user message with a single text part and a fresh message id
    pub async fn send_text(&self, text: impl Into<String>) -> A2aResult<Task> {
        self.send_message(Message::user(text)).await
    }

    /// Fetch the current snapshot of a task
    pub async fn get_task(&self, task_id: impl AsRef<str>) -> A2aResult<Task> {
        self.call(A2aMethod::GetTask, &TaskQueryParams::new(task_id.as_ref()))
            .await
    }

    /// Fetch the agent card
    pub async fn get_agent_card(&self) -> A2aResult<AgentCard> {
        let url = self.card_url()?;
        debug!(url = %url, "Fetching agent card");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| A2aError::connection_error(format!("Failed to fetch agent card: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| A2aError::protocol_error(format!("Failed to parse agent card: {}", e)))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Wait for a task to reach a terminal state.
    ///
    /// Polls every `poll_interval`. Retryable errors, such as a refused
    /// connection, are polled through. The whole loop, including in-flight
    /// requests, is bounded by `timeout`; past it the wait ends with
    /// [`A2aError::Timeout`].
    pub async fn wait_for_task(
        &self,
        task_id: impl AsRef<str>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> A2aResult<Task> {
        let task_id = task_id.as_ref();

        tokio::time::timeout(timeout, self.poll_until_terminal(task_id, poll_interval))
            .await
            .map_err(|_| A2aError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    async fn poll_until_terminal(&self, task_id: &str, poll_interval: Duration) -> A2aResult<Task> {
        loop {
            match self.get_task(task_id).await {
                Ok(task) if task.is_terminal() => return Ok(task),
                Ok(task) => {
                    debug!(task_id = %task_id, state = %task.state, "Task not finished yet")
                }
                Err(e) if e.is_retryable() => {
                    warn!(task_id = %task_id, error = %e, "Polling failed, retrying")
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// POST one JSON-RPC request and unwrap its result
    async fn call<P, T>(&self, method: A2aMethod, params: &P) -> A2aResult<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let id = RequestId::String(Uuid::new_v4().to_string());
        let request = JsonRpcRequest::new(method, params, id.clone())?;

        debug!(endpoint = %self.endpoint, method = %method, id = %id, "Sending request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    A2aError::connection_error(format!("Request to {} timed out", self.endpoint))
                } else {
                    A2aError::connection_error(format!("Failed to send {}: {}", method, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| A2aError::protocol_error(format!("Failed to parse response: {}", e)))?;

        // A null id is legal only on errors the server could not correlate
        let uncorrelated = envelope.is_error() && envelope.id == RequestId::Null;
        if envelope.id != id && !uncorrelated {
            return Err(A2aError::protocol_error(format!(
                "Response id {} does not match request id {}",
                envelope.id, id
            )));
        }

        envelope.into_result()
    }
}

/// Handle error responses from the agent
async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> A2aError {
    let error_text = response.text().await.unwrap_or_default();

    match status {
        StatusCode::NOT_FOUND => {
            A2aError::connection_error(format!("No agent at this endpoint: {}", error_text))
        }
        StatusCode::BAD_REQUEST => A2aError::InvalidMessage { reason: error_text },
        StatusCode::INTERNAL_SERVER_ERROR => A2aError::InternalError {
            message: error_text,
        },
        _ => A2aError::protocol_error(format!("HTTP {}: {}", status, error_text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = A2aClient::new("http://localhost:8000/summarizer/").unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://localhost:8000/summarizer/"
        );
    }

    #[test]
    fn test_invalid_url() {
        let result = A2aClient::new("not a valid url");
        assert!(matches!(result, Err(A2aError::UrlError(_))));
    }

    #[test]
    fn test_card_url_with_and_without_trailing_slash() {
        let with_slash = A2aClient::new("http://localhost:8000/summarizer/").unwrap();
        assert_eq!(
            with_slash.card_url().unwrap().as_str(),
            "http://localhost:8000/summarizer/.well-known/agent.json"
        );

        let without_slash = A2aClient::new("http://localhost:8000/summarizer").unwrap();
        assert_eq!(
            without_slash.card_url().unwrap().as_str(),
            "http://localhost:8000/summarizer/.well-known/agent.json"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_retryable() {
        // Port 9 (discard) is closed on test machines
        let client =
            A2aClient::with_timeout("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        let err = client.get_task("x").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_wait_for_task_polls_through_refused_connections() {
        let client =
            A2aClient::with_timeout("http://127.0.0.1:9/", Duration::from_millis(100)).unwrap();
        let err = client
            .wait_for_task("x", Duration::from_millis(10), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, A2aError::Timeout { timeout_ms: 300 }));
    }
}
