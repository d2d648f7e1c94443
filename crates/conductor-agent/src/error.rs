//! Error types for domain functions and agent hosting.

use conductor_a2a::A2aError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors a domain function may return while processing one task.
///
/// Any of these degrades only the task being processed to `failed`.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The task input cannot be processed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A downstream agent could not be reached or answered badly.
    #[error("Downstream agent '{agent}' failed: {message}")]
    Downstream { agent: String, message: String },

    /// Processing exceeded its time budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A2A protocol error.
    #[error("A2A error: {0}")]
    A2a(#[from] A2aError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Create a downstream failure
    pub fn downstream(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Downstream {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

/// Result type for domain functions.
pub type DomainResult<T> = Result<T, DomainError>;

/// Errors raised while assembling or running the agent host.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Agent registry could not be loaded or is inconsistent.
    #[error("Registry error: {0}")]
    Registry(String),

    /// Agent name is not in the registry.
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Listener could not be bound.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP server failed while running.
    #[error("Server error: {0}")]
    Server(String),

    /// A2A-specific error.
    #[error("A2A error: {0}")]
    A2a(#[from] A2aError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hosting operations.
pub type ConductorResult<T> = Result<T, ConductorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::downstream("Classifier Agent", "connection refused");
        assert_eq!(
            err.to_string(),
            "Downstream agent 'Classifier Agent' failed: connection refused"
        );
    }

    #[test]
    fn test_conductor_error_from_a2a() {
        let err: ConductorError = A2aError::task_not_found("t").into();
        assert!(matches!(err, ConductorError::A2a(_)));
    }
}
