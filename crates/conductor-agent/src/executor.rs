//! Worker executor
//!
//! Each agent runs one executor. It takes task ids off the agent's execution
//! queue one at a time, moves the task to `working`, runs the agent's domain
//! function on the latest user text, and records the outcome on the task in a
//! single store update. Whatever happens inside the domain function (error,
//! panic or timeout), the task ends `completed` or `failed` and the loop
//! carries on with the next id.

use conductor_a2a::{QueueReceiver, TaskContext, TaskState, TaskStore, TaskStoreExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::DomainFunction;

/// Settings for one executor
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Upper bound on a single domain call; unbounded when `None`
    pub task_timeout: Option<Duration>,
}

/// Result of one domain run before it is written back
enum Outcome {
    Reply(String),
    Failure(String),
}

/// Single-consumer processing loop for one agent
pub struct WorkerExecutor {
    agent: String,
    store: Arc<dyn TaskStore>,
    domain: Arc<dyn DomainFunction>,
    options: ExecutorOptions,
}

impl std::fmt::Debug for WorkerExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerExecutor")
            .field("agent", &self.agent)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl WorkerExecutor {
    pub fn new(
        agent: impl Into<String>,
        store: Arc<dyn TaskStore>,
        domain: Arc<dyn DomainFunction>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            agent: agent.into(),
            store,
            domain,
            options,
        }
    }

    /// Run the loop on a background task
    pub fn spawn(self, queue: QueueReceiver, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(queue, shutdown))
    }

    /// Process queued task ids until the queue ends or `shutdown` flips.
    ///
    /// A shutdown request is only observed between tasks, so the task being
    /// processed always reaches a terminal state first.
    pub async fn run(self, mut queue: QueueReceiver, mut shutdown: watch::Receiver<bool>) {
        info!(agent = %self.agent, "Worker executor started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = queue.dequeue() => match next {
                    Some(task_id) => {
                        self.execute(&task_id).await;
                    }
                    None => break,
                },
            }
        }
        queue.close();
        info!(agent = %self.agent, pending = queue.depth(), "Worker executor stopped");
    }

    /// Take one task from `submitted` to a terminal state.
    ///
    /// Returns the final state, or `None` when the task could not be claimed
    /// (unknown id, or no longer `submitted`).
    pub async fn execute(&self, task_id: &str) -> Option<TaskState> {
        let claimed = match self
            .store
            .update_with(task_id, |task| task.transition(TaskState::Working))
            .await
        {
            Ok(task) => task,
            Err(e) => {
                warn!(agent = %self.agent, task_id = %task_id, error = %e, "Could not claim task");
                return None;
            }
        };
        debug!(agent = %self.agent, task_id = %task_id, "Task claimed");

        let (outcome, context) = match claimed.last_user_text() {
            Some(text) => self.run_domain(task_id, text, claimed.context.clone()).await,
            None => (
                Outcome::Failure("task has no user text to process".to_string()),
                claimed.context.clone(),
            ),
        };

        self.finalize(task_id, outcome, context).await
    }

    /// Run the domain function on its own task so a panic is contained
    async fn run_domain(
        &self,
        task_id: &str,
        text: String,
        context: TaskContext,
    ) -> (Outcome, TaskContext) {
        let domain = Arc::clone(&self.domain);
        let before = context.clone();
        let handle = tokio::spawn(async move {
            let mut context = context;
            let result = domain.process(&text, &mut context).await;
            (result, context)
        });
        let abort = handle.abort_handle();

        let joined = match self.options.task_timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    warn!(agent = %self.agent, task_id = %task_id, timeout = ?limit, "Domain function timed out");
                    return (
                        Outcome::Failure(format!(
                            "processing did not finish within {}",
                            humantime::format_duration(limit)
                        )),
                        before,
                    );
                }
            },
            None => handle.await,
        };

        match joined {
            Ok((Ok(reply), context)) => (Outcome::Reply(reply), context),
            Ok((Err(e), context)) => {
                warn!(agent = %self.agent, task_id = %task_id, error = %e, "Domain function failed");
                (Outcome::Failure(e.to_string()), context)
            }
            Err(join_error) => {
                error!(agent = %self.agent, task_id = %task_id, error = %join_error, "Domain function panicked");
                let reason = if join_error.is_panic() {
                    "processing panicked".to_string()
                } else {
                    "processing was cancelled".to_string()
                };
                (Outcome::Failure(reason), before)
            }
        }
    }

    /// Write context and outcome back in one atomic update
    async fn finalize(
        &self,
        task_id: &str,
        outcome: Outcome,
        context: TaskContext,
    ) -> Option<TaskState> {
        let result = self
            .store
            .update_with(task_id, move |task| {
                task.context = context;
                match outcome {
                    Outcome::Reply(reply) => task.complete(reply),
                    Outcome::Failure(reason) => task.fail(reason),
                }
            })
            .await;

        match result {
            Ok(task) => {
                info!(agent = %self.agent, task_id = %task_id, state = %task.state, "Task finished");
                Some(task.state)
            }
            Err(e) => {
                error!(agent = %self.agent, task_id = %task_id, error = %e, "Could not record task outcome");
                // Last resort so the task does not stay `working`
                self.store
                    .update_with(task_id, move |task| task.fail(format!("could not record outcome: {}", e)))
                    .await
                    .ok()
                    .map(|task| task.state)
            }
        }
    }
}
