//! # Environment-Based Configuration
//!
//! Configuration for a Conductor host, loaded from defaults, then environment
//! variables, then explicit overrides (the CLI flags).
//!
//! ## Environment Variables
//!
//! ### Listener
//! - `CONDUCTOR_HOST` - Bind address (default: 127.0.0.1)
//! - `CONDUCTOR_PORT` - Bind port (default: 8000)
//! - `CONDUCTOR_PUBLIC_URL` - Base URL agents use to reach each other
//!   (default: `http://{host}:{port}`)
//!
//! ### Downstream calls
//! - `CONDUCTOR_POLL_INTERVAL` - Delay between `tasks/get` polls (default: 300ms)
//! - `CONDUCTOR_DOWNSTREAM_TIMEOUT` - Upper bound on waiting for one downstream
//!   task (default: 9s)
//! - `CONDUCTOR_REQUEST_TIMEOUT` - Timeout of a single HTTP call (default: 30s)
//!
//! ### Tasks
//! - `CONDUCTOR_TASK_TIMEOUT` - Upper bound on one domain function call (default: unset)
//! - `CONDUCTOR_TASK_RETENTION` - Evict terminal tasks older than this (default: unset)
//!
//! ### Agents
//! - `CONDUCTOR_REGISTRY_PATH` - JSON file of agent descriptors (default: built-in registry)
//! - `CONDUCTOR_AGENTS` - Comma-separated agent names to load (default: all three)
//!
//! Durations use humantime syntax (`300ms`, `9s`, `1h 30m`).

use std::{env, path::PathBuf, time::Duration};
use url::Url;

use crate::registry::{CLASSIFIER_AGENT, DIRECTOR_AGENT, SUMMARIZER_AGENT};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// How an orchestrator waits on downstream agents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two `tasks/get` polls
    pub interval: Duration,
    /// Upper bound on waiting for one downstream task
    pub timeout: Duration,
    /// Timeout of a single HTTP call
    pub request_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(300),
            timeout: Duration::from_secs(9),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Validated host configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConductorConfig {
    pub host: String,
    pub port: u16,
    pub public_url: Option<String>,
    pub poll: PollPolicy,
    pub task_timeout: Option<Duration>,
    pub task_retention: Option<Duration>,
    pub registry_path: Option<PathBuf>,
    pub agents: Vec<String>,
    pub store_dir: Option<PathBuf>,
}

impl ConductorConfig {
    /// `host:port` to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL agents use to reach each other
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            public_url: None,
            poll: PollPolicy::default(),
            task_timeout: None,
            task_retention: None,
            registry_path: None,
            agents: default_agents(),
            store_dir: None,
        }
    }
}

fn default_agents() -> Vec<String> {
    [SUMMARIZER_AGENT, CLASSIFIER_AGENT, DIRECTOR_AGENT]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Builder for `ConductorConfig` with environment variable support
#[derive(Debug, Clone, Default)]
pub struct ConductorConfigBuilder {
    config: ConductorConfig,
}

impl ConductorConfigBuilder {
    /// Create a new builder with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();

        // Listener
        if let Some(host) = lookup("CONDUCTOR_HOST") {
            builder = builder.host(host);
        }
        if let Some(port) = parse_u16(&lookup, "CONDUCTOR_PORT")? {
            builder = builder.port(port);
        }
        if let Some(url) = lookup("CONDUCTOR_PUBLIC_URL") {
            builder = builder.public_url(url);
        }

        // Downstream calls
        if let Some(interval) = parse_duration(&lookup, "CONDUCTOR_POLL_INTERVAL")? {
            builder = builder.poll_interval(interval);
        }
        if let Some(timeout) = parse_duration(&lookup, "CONDUCTOR_DOWNSTREAM_TIMEOUT")? {
            builder = builder.downstream_timeout(timeout);
        }
        if let Some(timeout) = parse_duration(&lookup, "CONDUCTOR_REQUEST_TIMEOUT")? {
            builder = builder.request_timeout(timeout);
        }

        // Tasks
        if let Some(timeout) = parse_duration(&lookup, "CONDUCTOR_TASK_TIMEOUT")? {
            builder = builder.task_timeout(timeout);
        }
        if let Some(retention) = parse_duration(&lookup, "CONDUCTOR_TASK_RETENTION")? {
            builder = builder.task_retention(retention);
        }

        // Agents
        if let Some(path) = lookup("CONDUCTOR_REGISTRY_PATH") {
            builder = builder.registry_path(PathBuf::from(path));
        }
        if let Some(names) = lookup("CONDUCTOR_AGENTS") {
            builder = builder.agents(parse_list(&names));
        }

        Ok(builder)
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn public_url(mut self, url: impl Into<String>) -> Self {
        self.config.public_url = Some(url.into());
        self
    }

    /// Set the delay between downstream polls
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll.interval = interval;
        self
    }

    /// Set the upper bound on waiting for one downstream task
    #[must_use]
    pub fn downstream_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll.timeout = timeout;
        self
    }

    /// Set the timeout of a single HTTP call
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config.task_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn task_retention(mut self, retention: Duration) -> Self {
        self.config.task_retention = Some(retention);
        self
    }

    #[must_use]
    pub fn registry_path(mut self, path: PathBuf) -> Self {
        self.config.registry_path = Some(path);
        self
    }

    /// Set the agent names to load
    #[must_use]
    pub fn agents(mut self, names: Vec<String>) -> Self {
        self.config.agents = names;
        self
    }

    /// Persist tasks as JSON files under this directory
    #[must_use]
    pub fn store_dir(mut self, dir: PathBuf) -> Self {
        self.config.store_dir = Some(dir);
        self
    }

    /// Validate configuration and build `ConductorConfig`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<ConductorConfig, ConfigError> {
        self.validate()?;
        Ok(self.config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        let config = &self.config;

        if config.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "host cannot be empty".to_string(),
            ));
        }

        if config.poll.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "poll_interval must be greater than 0".to_string(),
            ));
        }
        if config.poll.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "downstream_timeout must be greater than 0".to_string(),
            ));
        }
        if config.poll.interval > config.poll.timeout {
            return Err(ConfigError::ValidationError(
                "poll_interval must be <= downstream_timeout".to_string(),
            ));
        }
        if config.poll.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if config.task_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ValidationError(
                "task_timeout must be greater than 0".to_string(),
            ));
        }
        if config.task_retention.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ValidationError(
                "task_retention must be greater than 0".to_string(),
            ));
        }

        if config.agents.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one agent must be loaded".to_string(),
            ));
        }

        if let Some(url) = &config.public_url
            && let Err(e) = Url::parse(url)
        {
            return Err(ConfigError::ValidationError(format!(
                "public_url '{url}' is not a valid URL: {e}"
            )));
        }

        Ok(())
    }
}

// Environment variable helper functions

fn parse_u16<F>(lookup: &F, key: &str) -> Result<Option<u16>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val
            .parse::<u16>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u16 value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

fn parse_duration<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => humantime::parse_duration(&val)
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid duration '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
