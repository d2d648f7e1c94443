//! Per-agent runtime
//!
//! An [`AgentRuntime`] owns everything one agent needs: its task store, its
//! execution queue, the protocol handler that feeds the queue and the worker
//! executor that drains it. Nothing is shared between agents.

use axum::Router;
use chrono::Utc;
use conductor_a2a::{
    FileTaskStore, InMemoryTaskStore, ProtocolHandler, TaskStore, execution_queue,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::DomainFunction;
use crate::error::{ConductorError, ConductorResult};
use crate::executor::{ExecutorOptions, WorkerExecutor};
use crate::registry::AgentDescriptor;

/// Shortest and longest pause between two eviction sweeps
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Where an agent keeps its tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    InMemory,
    /// One JSON file per task under `<dir>/<agent mount path>`
    File(PathBuf),
}

/// Settings shared by every runtime on a host
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub store: StoreBackend,
    pub task_timeout: Option<Duration>,
    /// Terminal tasks older than this are evicted; kept forever when `None`
    pub task_retention: Option<Duration>,
}

/// One running agent
pub struct AgentRuntime {
    descriptor: AgentDescriptor,
    handler: Arc<ProtocolHandler>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("agent", &self.descriptor.name)
            .field("mount_path", &self.descriptor.mount_path())
            .finish_non_exhaustive()
    }
}

impl AgentRuntime {
    /// Create the agent's store and queue and start its executor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        descriptor: AgentDescriptor,
        domain: Arc<dyn DomainFunction>,
        options: &RuntimeOptions,
    ) -> ConductorResult<Self> {
        let store = open_store(&descriptor, &options.store)?;
        let (queue_tx, queue_rx) = execution_queue();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let executor = WorkerExecutor::new(
            &descriptor.name,
            Arc::clone(&store),
            domain,
            ExecutorOptions {
                task_timeout: options.task_timeout,
            },
        );
        let mut workers = vec![executor.spawn(queue_rx, shutdown_rx.clone())];

        if let Some(retention) = options.task_retention {
            workers.push(spawn_eviction(
                descriptor.name.clone(),
                Arc::clone(&store),
                retention,
                shutdown_rx,
            ));
        }

        let handler = Arc::new(ProtocolHandler::new(descriptor.card(), store, queue_tx));
        info!(agent = %descriptor.name, path = %descriptor.mount_path(), "Agent runtime started");

        Ok(Self {
            descriptor,
            handler,
            shutdown,
            workers,
        })
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    pub fn handler(&self) -> &Arc<ProtocolHandler> {
        &self.handler
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        self.handler.store()
    }

    /// JSON-RPC and agent card routes at the agent's mount path
    pub fn router(&self) -> Router {
        Arc::clone(&self.handler).router_at(&self.descriptor.mount_path())
    }

    /// Stop the executor after its current task and wait for it
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(agent = %self.descriptor.name, error = %e, "Runtime worker ended abnormally");
            }
        }
        info!(agent = %self.descriptor.name, "Agent runtime stopped");
    }
}

fn open_store(
    descriptor: &AgentDescriptor,
    backend: &StoreBackend,
) -> ConductorResult<Arc<dyn TaskStore>> {
    Ok(match backend {
        StoreBackend::InMemory => Arc::new(InMemoryTaskStore::new()),
        StoreBackend::File(root) => {
            let subdir = store_dir_name(&descriptor.mount_path());
            if subdir.is_empty() {
                return Err(ConductorError::Registry(format!(
                    "agent '{}' has no path to store its tasks under",
                    descriptor.name
                )));
            }
            Arc::new(FileTaskStore::new(root.join(subdir))?)
        }
    })
}

/// Directory name for an agent's tasks.
///
/// ASCII letters, digits and `-` are kept; every other byte becomes `_xx`,
/// so distinct mount paths never share a directory.
fn store_dir_name(mount_path: &str) -> String {
    let mut name = String::with_capacity(mount_path.len());
    for byte in mount_path.trim_matches('/').bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{:02x}", byte));
        }
    }
    name
}

/// Periodically drop terminal tasks older than `retention`
fn spawn_eviction(
    agent: String,
    store: Arc<dyn TaskStore>,
    retention: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = retention.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let Ok(age) = chrono::Duration::from_std(retention) else {
                        break;
                    };
                    match store.evict_terminal(Utc::now() - age).await {
                        Ok(0) => {}
                        Ok(evicted) => debug!(agent = %agent, evicted, "Evicted expired tasks"),
                        Err(e) => warn!(agent = %agent, error = %e, "Task eviction failed"),
                    }
                }
            }
        }
    })
}
