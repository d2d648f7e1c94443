//! Multi-agent host
//!
//! Runs several agent runtimes behind one HTTP listener. Each agent keeps its
//! own store, queue and executor; the host only merges their routes and adds
//! `GET /agents` for discovery.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ConductorConfig;
use crate::domain;
use crate::error::{ConductorError, ConductorResult};
use crate::registry::{AgentDescriptor, AgentRegistry};
use crate::runtime::{AgentRuntime, RuntimeOptions, StoreBackend};

/// Path of the host's agent listing
pub const AGENTS_PATH: &str = "/agents";

/// Body of `GET /agents`
#[derive(Debug, Clone, Serialize)]
pub struct AgentsListResponse {
    pub agents: Vec<AgentDescriptor>,
    pub total: usize,
}

async fn list_agents(
    State(agents): State<Arc<Vec<AgentDescriptor>>>,
) -> Json<AgentsListResponse> {
    Json(AgentsListResponse {
        agents: agents.as_ref().clone(),
        total: agents.len(),
    })
}

/// Registry named by the configuration, or the built-in agents at the
/// configured public URL
pub fn load_registry(config: &ConductorConfig) -> ConductorResult<AgentRegistry> {
    match &config.registry_path {
        Some(path) => AgentRegistry::from_json_file(path),
        None => AgentRegistry::local(&config.public_url()),
    }
}

impl From<&ConductorConfig> for RuntimeOptions {
    fn from(config: &ConductorConfig) -> Self {
        Self {
            store: config
                .store_dir
                .clone()
                .map(StoreBackend::File)
                .unwrap_or_default(),
            task_timeout: config.task_timeout,
            task_retention: config.task_retention,
        }
    }
}

/// Set of running agents served together
#[derive(Debug)]
pub struct AgentHost {
    runtimes: Vec<AgentRuntime>,
}

impl AgentHost {
    /// Start a runtime for every configured agent in `registry`
    pub fn build(config: &ConductorConfig, registry: &AgentRegistry) -> ConductorResult<Self> {
        let options = RuntimeOptions::from(config);
        let mut runtimes = Vec::new();
        for descriptor in registry.select(&config.agents)? {
            let domain = domain::from_descriptor(&descriptor, registry, config.poll)?;
            runtimes.push(AgentRuntime::spawn(descriptor, domain, &options)?);
        }
        Self::from_runtimes(runtimes)
    }

    /// Host already started runtimes, rejecting clashing mount paths
    pub fn from_runtimes(runtimes: Vec<AgentRuntime>) -> ConductorResult<Self> {
        let mut paths = HashSet::new();
        for runtime in &runtimes {
            let path = runtime.descriptor().mount_path();
            if path == "/" || path == AGENTS_PATH || !paths.insert(path.clone()) {
                return Err(ConductorError::Registry(format!(
                    "agent '{}' cannot be mounted at {}",
                    runtime.descriptor().name,
                    path
                )));
            }
        }
        Ok(Self { runtimes })
    }

    pub fn runtimes(&self) -> &[AgentRuntime] {
        &self.runtimes
    }

    pub fn runtime(&self, name: &str) -> Option<&AgentRuntime> {
        self.runtimes.iter().find(|r| r.descriptor().name == name)
    }

    /// All agent routes plus the agent listing
    pub fn router(&self) -> Router {
        let descriptors: Vec<AgentDescriptor> = self
            .runtimes
            .iter()
            .map(|r| r.descriptor().clone())
            .collect();

        self.runtimes.iter().fold(
            Router::new()
                .route(AGENTS_PATH, get(list_agents))
                .with_state(Arc::new(descriptors)),
            |router, runtime| router.merge(runtime.router()),
        )
    }

    /// Bind the configured address
    pub async fn bind(config: &ConductorConfig) -> ConductorResult<TcpListener> {
        let addr = config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ConductorError::Bind { addr, source })
    }

    /// Serve until `signal` completes, then stop every runtime
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> ConductorResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        {
            let names: Vec<&str> = self
                .runtimes
                .iter()
                .map(|r| r.descriptor().name.as_str())
                .collect();
            info!(%addr, agents = ?names, "Conductor host listening");
        }

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await;
        self.shutdown().await;
        served.map_err(|e| ConductorError::Server(e.to_string()))
    }

    /// Stop every runtime after its current task
    pub async fn shutdown(self) {
        futures::future::join_all(self.runtimes.into_iter().map(AgentRuntime::shutdown)).await;
        info!("Conductor host stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConductorConfigBuilder;
    use crate::domain::Summarizer;
    use crate::registry::{AgentProfile, CLASSIFIER_AGENT, DIRECTOR_AGENT, SUMMARIZER_AGENT};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn config() -> ConductorConfig {
        ConductorConfigBuilder::new().build().unwrap()
    }

    #[tokio::test]
    async fn test_build_loads_configured_agents() {
        let config = config();
        let registry = load_registry(&config).unwrap();
        let host = AgentHost::build(&config, &registry).unwrap();

        assert_eq!(host.runtimes().len(), 3);
        assert!(host.runtime(DIRECTOR_AGENT).is_some());
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_subset() {
        let config = ConductorConfigBuilder::new()
            .agents(vec![CLASSIFIER_AGENT.to_string()])
            .build()
            .unwrap();
        let registry = load_registry(&config).unwrap();
        let host = AgentHost::build(&config, &registry).unwrap();

        assert_eq!(host.runtimes().len(), 1);
        assert!(host.runtime(SUMMARIZER_AGENT).is_none());
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_unknown_agent() {
        let config = ConductorConfigBuilder::new()
            .agents(vec!["nobody".to_string()])
            .build()
            .unwrap();
        let registry = load_registry(&config).unwrap();
        assert!(matches!(
            AgentHost::build(&config, &registry),
            Err(ConductorError::AgentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_agents_listing() {
        let config = config();
        let registry = load_registry(&config).unwrap();
        let host = AgentHost::build(&config, &registry).unwrap();

        let response = host
            .router()
            .oneshot(Request::get("/agents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let listing: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(listing["total"], 3);
        assert_eq!(listing["agents"][0]["name"], SUMMARIZER_AGENT);
        assert_eq!(listing["agents"][2]["profile"]["type"], "director");
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_each_agent_has_its_card() {
        let config = config();
        let registry = load_registry(&config).unwrap();
        let host = AgentHost::build(&config, &registry).unwrap();
        let router = host.router();

        for path in ["/summarizer", "/classifier", "/director"] {
            let response = router
                .clone()
                .oneshot(
                    Request::get(format!("{}/.well-known/agent.json", path))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", path);
        }
        host.shutdown().await;
    }

    #[tokio::test]
    async fn test_clashing_mount_paths_rejected() {
        let options = RuntimeOptions::default();
        let profile = AgentProfile::Summarizer { fallback_length: 5 };
        let first = AgentRuntime::spawn(
            AgentDescriptor::new("a", "http://localhost:1/same/", profile.clone()),
            Arc::new(Summarizer::default()),
            &options,
        )
        .unwrap();
        let second = AgentRuntime::spawn(
            AgentDescriptor::new("b", "http://localhost:1/same", profile.clone()),
            Arc::new(Summarizer::default()),
            &options,
        )
        .unwrap();
        assert!(AgentHost::from_runtimes(vec![first, second]).is_err());

        let listing_clash = AgentRuntime::spawn(
            AgentDescriptor::new("c", "http://localhost:1/agents/", profile),
            Arc::new(Summarizer::default()),
            &options,
        )
        .unwrap();
        assert!(AgentHost::from_runtimes(vec![listing_clash]).is_err());
    }

    #[test]
    fn test_runtime_options_from_config() {
        let config = ConductorConfigBuilder::new()
            .store_dir("/tmp/conductor".into())
            .build()
            .unwrap();
        let options = RuntimeOptions::from(&config);
        assert_eq!(options.store, StoreBackend::File("/tmp/conductor".into()));
        assert_eq!(RuntimeOptions::from(&self::config()).store, StoreBackend::InMemory);
    }
}
