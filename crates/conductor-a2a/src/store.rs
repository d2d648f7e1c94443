//! Per-agent task storage.
//!
//! Every agent owns exactly one [`TaskStore`]. Stores are never shared
//! between agents, so task ids only need to be unique within one store.
//!
//! # Features
//!
//! - **TaskStore trait**: async get/create/update/list contract
//! - **InMemoryTaskStore**: volatile default backend
//! - **FileTaskStore**: JSON-file backend (see [`crate::file_store`])
//! - **Eviction**: optional removal of terminal tasks past a retention age
//!
//! # Example
//!
//! ```rust
//! use conductor_a2a::{InMemoryTaskStore, Message, TaskState, TaskStore, TaskStoreExt};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryTaskStore::new();
//! let task = store.create(Message::user("hello")).await?;
//!
//! store
//!     .update_with(&task.id, |t| t.transition(TaskState::Working))
//!     .await?;
//!
//! assert_eq!(store.get(&task.id).await?.state, TaskState::Working);
//! # Ok::<(), conductor_a2a::A2aError>(())
//! # });
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::error::{A2aError, A2aResult};
use crate::types::{Message, Task};

/// Read-modify-write step applied atomically by [`TaskStore::update`].
///
/// Returning an error aborts the update and leaves the stored task untouched.
pub type TaskMutator = Box<dyn FnOnce(&mut Task) -> A2aResult<()> + Send>;

// ============================================================================
// Task Store Trait
// ============================================================================

/// Async trait for task persistence.
///
/// Implementations must make a `get` that follows a completed `update` on the
/// same task observe that update, and must serialize concurrent updates to
/// the same task id.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a submitted task whose history holds `initial`.
    ///
    /// The generated id is never one this store has handed out before.
    async fn create(&self, initial: Message) -> A2aResult<Task>;

    /// Get a task by ID.
    async fn get(&self, task_id: &str) -> A2aResult<Task>;

    /// Atomically apply `mutator` to a task and return the stored result.
    async fn update(&self, task_id: &str, mutator: TaskMutator) -> A2aResult<Task>;

    /// All tasks, oldest first.
    async fn list(&self) -> A2aResult<Vec<Task>>;

    /// Remove terminal tasks last updated before `cutoff`.
    async fn evict_terminal(&self, cutoff: DateTime<Utc>) -> A2aResult<usize>;

    /// Number of stored tasks.
    async fn len(&self) -> A2aResult<usize> {
        Ok(self.list().await?.len())
    }
}

/// Convenience methods for [`TaskStore`] that take plain closures.
#[async_trait]
pub trait TaskStoreExt: TaskStore {
    /// [`TaskStore::update`] without boxing at the call site
    async fn update_with<F>(&self, task_id: &str, mutator: F) -> A2aResult<Task>
    where
        F: FnOnce(&mut Task) -> A2aResult<()> + Send + 'static,
    {
        self.update(task_id, Box::new(mutator)).await
    }
}

impl<T: TaskStore + ?Sized> TaskStoreExt for T {}

/// Reject mutations that would break the task invariants.
///
/// Applied by every backend after running a mutator, so a buggy mutator can
/// neither rewrite the id, shrink the history nor move the state backwards.
pub(crate) fn check_update(before: &Task, after: &Task) -> A2aResult<()> {
    if after.id != before.id {
        return Err(A2aError::internal_error(format!(
            "Task id changed during update: {} -> {}",
            before.id, after.id
        )));
    }
    if after.history.len() < before.history.len() {
        return Err(A2aError::internal_error(format!(
            "History of task {} shrank during update",
            before.id
        )));
    }
    if after.state != before.state && !before.state.can_transition_to(after.state) {
        return Err(A2aError::InvalidStateTransition {
            task_id: before.id.clone(),
            from: before.state.to_string(),
            to: after.state.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// In-Memory Task Store
// ============================================================================

/// Volatile task store backed by a sharded concurrent map.
///
/// Updates to the same task serialize on the entry's shard lock; updates to
/// tasks in other shards proceed in parallel. Mutators run synchronously, so
/// no lock is ever held across an await point.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<String, Task>,
}

impl InMemoryTaskStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, initial: Message) -> A2aResult<Task> {
        loop {
            let task = Task::new_with_uuid(initial.clone());
            if let Entry::Vacant(slot) = self.tasks.entry(task.id.clone()) {
                slot.insert(task.clone());
                debug!(task_id = %task.id, "Created task");
                return Ok(task);
            }
        }
    }

    async fn get(&self, task_id: &str) -> A2aResult<Task> {
        self.tasks
            .get(task_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| A2aError::task_not_found(task_id))
    }

    async fn update(&self, task_id: &str, mutator: TaskMutator) -> A2aResult<Task> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| A2aError::task_not_found(task_id))?;

        let mut next = entry.value().clone();
        mutator(&mut next)?;
        check_update(entry.value(), &next)?;

        *entry.value_mut() = next.clone();
        Ok(next)
    }

    async fn list(&self) -> A2aResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self.tasks.iter().map(|e| e.value().clone()).collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn evict_terminal(&self, cutoff: DateTime<Utc>) -> A2aResult<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| {
            !(task.is_terminal() && task.updated_at.is_some_and(|at| at < cutoff))
        });
        Ok(before.saturating_sub(self.tasks.len()))
    }

    async fn len(&self) -> A2aResult<usize> {
        Ok(self.tasks.len())
    }
}
