//! # Conductor Agent
//!
//! Agents, their processing loop and the host that serves them.
//!
//! - [`domain`]: the summarizer, classifier and director domain functions
//! - [`executor`]: the single-consumer worker loop that runs them
//! - [`runtime`]: one agent's store, queue, handler and executor
//! - [`host`]: several runtimes behind one listener
//! - [`registry`] and [`config`]: which agents exist and how they are run
//!
//! ```no_run
//! use conductor_agent::{AgentHost, ConductorConfigBuilder, load_registry, shutdown_signal};
//!
//! # async fn run() -> conductor_agent::ConductorResult<()> {
//! let config = ConductorConfigBuilder::from_env()?.build()?;
//! let registry = load_registry(&config)?;
//! let listener = AgentHost::bind(&config).await?;
//! AgentHost::build(&config, &registry)?
//!     .serve(listener, shutdown_signal())
//!     .await
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod host;
pub mod registry;
pub mod runtime;
pub mod shutdown;

pub use config::{ConductorConfig, ConductorConfigBuilder, ConfigError, PollPolicy};
pub use domain::{Classifier, DomainFunction, Director, Summarizer, render_conclusions};
pub use error::{ConductorError, ConductorResult, DomainError, DomainResult};
pub use executor::{ExecutorOptions, WorkerExecutor};
pub use host::{AgentHost, AgentsListResponse, load_registry};
pub use registry::{
    AgentDescriptor, AgentProfile, AgentRegistry, AgentStatus, CLASSIFIER_AGENT, DIRECTOR_AGENT,
    KeywordRule, SUMMARIZER_AGENT,
};
pub use runtime::{AgentRuntime, RuntimeOptions, StoreBackend};
pub use shutdown::shutdown_signal;
