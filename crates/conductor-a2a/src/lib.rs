//! # Conductor A2A - Task Protocol Plumbing
//!
//! This crate provides the agent-to-agent task protocol used by Conductor
//! agents: the wire types, the JSON-RPC 2.0 envelope, and the per-agent
//! task store and execution queue that sit behind the protocol handler.
//!
//! ## Features
//!
//! - **Core Types**: Task, Message, Part and AgentCard types
//! - **JSON-RPC**: `message/send` and `tasks/get` envelopes with error codes
//! - **Task Store**: in-memory and file-backed stores with atomic updates
//! - **Execution Queue**: FIFO of task ids between handler and executor
//! - **A2A Client**: Talk to agents over HTTP (requires `client` feature)
//! - **A2A Server**: Serve an agent over HTTP (requires `server` feature)
//!
//! ## Protocol Overview
//!
//! Agents talk in two phases:
//!
//! 1. `message/send` creates a task in state `submitted` and returns at once
//! 2. `tasks/get` is polled until the task is `completed` or `failed`
//!
//! ## Example: Working with Tasks
//!
//! ```rust
//! use conductor_a2a::{Message, Task, TaskState};
//!
//! let mut task = Task::new("task-001", Message::user("Please summarize this"));
//! assert_eq!(task.state, TaskState::Submitted);
//!
//! task.transition(TaskState::Working).unwrap();
//! task.complete("A summary").unwrap();
//!
//! assert!(task.is_terminal());
//! assert_eq!(task.last_agent_text().as_deref(), Some("A summary"));
//! ```

pub mod error;
pub mod file_store;
pub mod jsonrpc;
pub mod queue;
pub mod store;
pub mod types;

// Client module (requires client feature)
#[cfg(feature = "client")]
pub mod client;

// Server module (requires server feature)
#[cfg(feature = "server")]
pub mod server;

// Re-export core types
pub use error::{A2aError, A2aResult};
pub use file_store::FileTaskStore;
pub use jsonrpc::{
    A2aMethod, JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, codes,
};
pub use queue::{QueueReceiver, QueueSender, execution_queue};
pub use store::{InMemoryTaskStore, TaskMutator, TaskStore, TaskStoreExt};
pub use types::{
    // Agent Card types
    AgentCapabilities,
    AgentCard,
    // Message types
    DataPart,
    FilePart,
    Message,
    MessageKind,
    // Request types
    MessageSendParams,
    Part,
    Role,
    // Task types
    Task,
    TaskContext,
    TaskQueryParams,
    TaskState,
    TextPart,
};

// Re-export client types
#[cfg(feature = "client")]
pub use client::A2aClient;

// Re-export server types
#[cfg(feature = "server")]
pub use server::ProtocolHandler;
