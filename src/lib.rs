//! # Conductor
//!
//! Task-oriented multi-agent orchestration. Agents accept work over a small
//! JSON-RPC protocol, run it asynchronously on a per-agent worker, and are
//! polled for the result; a director agent fans a request out to other agents
//! and combines their answers.
//!
//! - [`a2a`]: protocol types, task store, execution queue, client and handler
//! - [`agent`]: domain functions, worker executor, runtimes and the host

pub use conductor_a2a as a2a;
pub use conductor_agent as agent;

pub use conductor_a2a::{A2aClient, A2aError, Message, Task, TaskState};
pub use conductor_agent::{AgentHost, AgentRegistry, ConductorConfig, ConductorConfigBuilder};
