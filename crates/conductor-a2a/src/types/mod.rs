//! A2A Protocol Core Types
//!
//! This module defines the data types exchanged between Conductor agents:
//! messages and their parts, tasks and their lifecycle state, method
//! parameters, and the agent card used for discovery.
//!
//! ## Module Structure
//!
//! - [`task`] - Task lifecycle and state types
//! - [`message`] - Message and role types
//! - [`part`] - Content part types (text, file, data)
//! - [`agent_card`] - Agent capability discovery
//! - [`request`] - Method parameter types

mod agent_card;
mod message;
mod part;
mod request;
mod task;

// Re-export all types for convenience
pub use agent_card::{AgentCapabilities, AgentCard};
pub use message::{Message, MessageKind, Role};
pub use part::{DataPart, FilePart, Part, TextPart};
pub use request::{MessageSendParams, TaskQueryParams};
pub use task::{Task, TaskContext, TaskState};
