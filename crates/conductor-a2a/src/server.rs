//! A2A Protocol Handler
//!
//! Maps incoming JSON-RPC envelopes onto an agent's task store and execution
//! queue, and exposes them over HTTP with axum.
//!
//! The handler never runs domain logic itself: `message/send` creates a task,
//! enqueues its id and returns at once, `tasks/get` is a single store read.
//! Malformed requests are answered with a JSON-RPC error object and never
//! reach the task system.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use conductor_a2a::{AgentCard, InMemoryTaskStore, ProtocolHandler, execution_queue};
//!
//! let (queue, _receiver) = execution_queue();
//! let handler = ProtocolHandler::new(
//!     AgentCard::new("Echo Agent", "http://localhost:8000/echo/"),
//!     Arc::new(InMemoryTaskStore::new()),
//!     queue,
//! );
//! let router = Arc::new(handler).router_at("/echo");
//! # let _ = router;
//! ```

use axum::{Json, Router, body::Bytes, extract::State, routing::get, routing::post};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::error::{A2aError, A2aResult};
use crate::jsonrpc::{A2aMethod, JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::queue::QueueSender;
use crate::store::TaskStore;
use crate::types::{AgentCard, Message, MessageSendParams, TaskQueryParams};

/// Per-agent JSON-RPC dispatcher.
pub struct ProtocolHandler {
    card: AgentCard,
    store: Arc<dyn TaskStore>,
    queue: QueueSender,
}

impl std::fmt::Debug for ProtocolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolHandler")
            .field("agent", &self.card.name)
            .field("queue_depth", &self.queue.depth())
            .finish()
    }
}

impl ProtocolHandler {
    /// Create a handler over an agent's own store and queue
    pub fn new(card: AgentCard, store: Arc<dyn TaskStore>, queue: QueueSender) -> Self {
        Self { card, store, queue }
    }

    /// Card published at `.well-known/agent.json`
    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    /// The agent's task store
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Handle a raw request body.
    ///
    /// Bodies that are not JSON are answered with a parse error, JSON that is
    /// not a request envelope with an invalid-request error.
    pub async fn handle_bytes(&self, body: &[u8]) -> JsonRpcResponse {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                debug!(agent = %self.card.name, error = %e, "Unparseable request body");
                return JsonRpcResponse::failure(
                    RequestId::Null,
                    A2aError::ParseError {
                        message: e.to_string(),
                    },
                );
            }
        };

        // Echo the id whenever one can be recovered, even from a bad envelope
        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok())
            .unwrap_or_default();

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => JsonRpcResponse::failure(
                id,
                A2aError::InvalidRequest {
                    message: e.to_string(),
                },
            ),
        }
    }

    /// Dispatch a parsed request and build its response envelope.
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match self.dispatch(&request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                debug!(
                    agent = %self.card.name,
                    method = %request.method,
                    code = e.code(),
                    error = %e,
                    "Request rejected"
                );
                JsonRpcResponse::failure(id, e)
            }
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> A2aResult<Value> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(A2aError::InvalidRequest {
                message: format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            });
        }

        match A2aMethod::parse(&request.method) {
            Some(A2aMethod::SendMessage) => self.send_message(request.parse_params()?).await,
            Some(A2aMethod::GetTask) => self.get_task(request.parse_params()?).await,
            None => Err(A2aError::method_not_found(&request.method)),
        }
    }

    /// `message/send`: create a submitted task, enqueue it, return its snapshot
    async fn send_message(&self, params: MessageSendParams) -> A2aResult<Value> {
        validate_message(&params.message)?;

        let task = self.store.create(params.message).await?;
        if let Err(e) = self.queue.enqueue(task.id.clone()) {
            warn!(agent = %self.card.name, task_id = %task.id, "Execution queue closed");
            return Err(e);
        }

        debug!(agent = %self.card.name, task_id = %task.id, "Task submitted");
        Ok(serde_json::to_value(&task)?)
    }

    /// `tasks/get`: current snapshot of a task
    async fn get_task(&self, params: TaskQueryParams) -> A2aResult<Value> {
        let task = self
            .store
            .get(&params.id)
            .await?
            .with_history_limit(params.history_length);
        Ok(serde_json::to_value(&task)?)
    }

    /// Build the HTTP router for this agent mounted at `prefix`.
    ///
    /// JSON-RPC is accepted on both `{prefix}` and `{prefix}/`; the agent card
    /// is served at `{prefix}/.well-known/agent.json`.
    pub fn router_at(self: Arc<Self>, prefix: &str) -> Router {
        let prefix = normalize_prefix(prefix);

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let mut router = Router::new()
            .route(&format!("{}/", prefix), post(rpc_endpoint))
            .route(
                &format!("{}/.well-known/agent.json", prefix),
                get(agent_card_endpoint),
            );
        if !prefix.is_empty() {
            router = router.route(&prefix, post(rpc_endpoint));
        }

        router
            .with_state(self)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }
}

/// Reject messages with no parts or without any text part
fn validate_message(message: &Message) -> A2aResult<()> {
    if message.parts.is_empty() {
        return Err(A2aError::invalid_message("message has no parts"));
    }
    if !message.has_text() {
        return Err(A2aError::invalid_message("message has no text part"));
    }
    Ok(())
}

/// `"/summarizer/"` -> `"/summarizer"`, `"/"` -> `""`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST {prefix} - JSON-RPC endpoint
async fn rpc_endpoint(
    State(handler): State<Arc<ProtocolHandler>>,
    body: Bytes,
) -> Json<JsonRpcResponse> {
    Json(handler.handle_bytes(&body).await)
}

/// GET {prefix}/.well-known/agent.json - Agent card discovery
async fn agent_card_endpoint(State(handler): State<Arc<ProtocolHandler>>) -> Json<AgentCard> {
    debug!(agent = %handler.card.name, "Serving agent card");
    Json(handler.card.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::codes;
    use crate::queue::{QueueReceiver, execution_queue};
    use crate::store::InMemoryTaskStore;
    use crate::types::{Part, Task, TaskState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn test_handler() -> (Arc<ProtocolHandler>, QueueReceiver) {
        let (queue, receiver) = execution_queue();
        let handler = ProtocolHandler::new(
            AgentCard::new("Echo Agent", "http://localhost:8000/echo/"),
            Arc::new(InMemoryTaskStore::new()),
            queue,
        );
        (Arc::new(handler), receiver)
    }

    fn send_request(text: &str, id: i64) -> JsonRpcRequest {
        JsonRpcRequest::new(
            A2aMethod::SendMessage,
            &MessageSendParams::new(Message::user(text)),
            id,
        )
        .unwrap()
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> Value {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_send_creates_submitted_task_and_enqueues() {
        let (handler, mut receiver) = test_handler();

        let response = handler.handle(send_request("hello", 1)).await;
        assert_eq!(response.id, RequestId::from(1));
        let task: Task = response.into_result().unwrap();

        assert_eq!(task.state, TaskState::Submitted);
        assert_eq!(receiver.dequeue().await, Some(task.id));
    }

    #[tokio::test]
    async fn test_get_before_dequeue_is_submitted() {
        let (handler, _receiver) = test_handler();

        let created: Task = handler
            .handle(send_request("hello", 1))
            .await
            .into_result()
            .unwrap();

        let query = JsonRpcRequest::new(
            A2aMethod::GetTask,
            &TaskQueryParams::new(&created.id),
            "q-1",
        )
        .unwrap();
        let response = handler.handle(query).await;
        assert_eq!(response.id, RequestId::from("q-1"));

        let task: Task = response.into_result().unwrap();
        assert_eq!(task.state, TaskState::Submitted);
        assert_eq!(task.history.len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let (handler, _receiver) = test_handler();
        let query =
            JsonRpcRequest::new(A2aMethod::GetTask, &TaskQueryParams::new("missing"), 9).unwrap();

        let response = handler.handle(query).await;
        assert_eq!(response.error.unwrap().code, codes::TASK_NOT_FOUND);
        assert_eq!(response.id, RequestId::from(9));
    }

    #[tokio::test]
    async fn test_empty_parts_never_enter_task_system() {
        let (handler, mut receiver) = test_handler();
        let mut message = Message::user("x");
        message.parts.clear();

        let request =
            JsonRpcRequest::new(A2aMethod::SendMessage, &MessageSendParams::new(message), 2)
                .unwrap();
        let response = handler.handle(request).await;

        assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
        assert_eq!(handler.store().len().await.unwrap(), 0);
        receiver.close();
        assert_eq!(receiver.dequeue().await, None);
    }

    #[tokio::test]
    async fn test_message_without_text_part_rejected() {
        let (handler, _receiver) = test_handler();
        let mut message = Message::user("x");
        message.parts = vec![Part::data(json!({"k": "v"}))];

        let request =
            JsonRpcRequest::new(A2aMethod::SendMessage, &MessageSendParams::new(message), 3)
                .unwrap();
        let response = handler.handle(request).await;

        assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
        assert_eq!(handler.store().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (handler, _receiver) = test_handler();
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            method: "tasks/cancel".into(),
            params: json!({"id": "x"}),
            id: RequestId::from("abc"),
        };

        let response = handler.handle(request).await;
        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);
        assert_eq!(response.id, RequestId::from("abc"));
    }

    #[tokio::test]
    async fn test_wrong_version_rejected() {
        let (handler, _receiver) = test_handler();
        let mut request = send_request("hi", 4);
        request.jsonrpc = "1.0".into();

        let response = handler.handle(request).await;
        assert_eq!(response.error.unwrap().code, codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_error_over_http() {
        let (handler, _receiver) = test_handler();
        let router = handler.router_at("/echo");

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo/")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["error"]["code"], codes::PARSE_ERROR);
        assert!(json["id"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_envelope_echoes_id() {
        let (handler, _receiver) = test_handler();
        let json = post_json(
            handler.router_at("/echo"),
            "/echo",
            json!({"jsonrpc": "2.0", "id": 77}),
        )
        .await;

        assert_eq!(json["error"]["code"], codes::INVALID_REQUEST);
        assert_eq!(json["id"], 77);
    }

    #[tokio::test]
    async fn test_non_integer_numeric_ids_are_echoed() {
        let (handler, _receiver) = test_handler();

        for raw in ["1.5", "18446744073709551615"] {
            let body = format!(
                r#"{{"jsonrpc":"2.0","id":{},"method":"tasks/get","params":{{"id":"missing"}}}}"#,
                raw
            );
            let response = handler.handle_bytes(body.as_bytes()).await;

            assert_eq!(response.error.unwrap().code, codes::TASK_NOT_FOUND, "{}", raw);
            assert_eq!(serde_json::to_string(&response.id).unwrap(), raw);
        }
    }

    #[tokio::test]
    async fn test_router_accepts_both_trailing_forms() {
        let (handler, _receiver) = test_handler();
        let router = handler.router_at("/echo/");
        let body = serde_json::to_value(send_request("hi", 1)).unwrap();

        let with_slash = post_json(router.clone(), "/echo/", body.clone()).await;
        let without_slash = post_json(router, "/echo", body).await;

        assert_eq!(with_slash["result"]["state"], "submitted");
        assert_eq!(without_slash["result"]["state"], "submitted");
        assert_ne!(with_slash["result"]["id"], without_slash["result"]["id"]);
    }

    #[tokio::test]
    async fn test_agent_card_endpoint() {
        let (handler, _receiver) = test_handler();
        let router = handler.router_at("/echo");

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/echo/.well-known/agent.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let card: AgentCard = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(card.name, "Echo Agent");
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/summarizer/"), "/summarizer");
        assert_eq!(normalize_prefix("summarizer"), "/summarizer");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }
}
