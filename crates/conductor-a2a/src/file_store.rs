//! JSON-file task store.
//!
//! Each task lives in `{directory}/{task_id}.json`. Writes go through a
//! temporary file and a rename, so readers never observe a half-written task.
//! Updates to one task id serialize on a per-id async lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{A2aError, A2aResult};
use crate::store::{TaskMutator, TaskStore, check_update};
use crate::types::{Message, Task};

/// File-based task store for persistence across restarts.
#[derive(Debug)]
pub struct FileTaskStore {
    directory: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
    create_lock: Mutex<()>,
}

impl FileTaskStore {
    /// Create a new file-based store.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(directory: impl Into<PathBuf>) -> A2aResult<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        info!(directory = %directory.display(), "Created file task store");
        Ok(Self {
            directory,
            locks: DashMap::new(),
            create_lock: Mutex::new(()),
        })
    }

    /// Directory holding the task files
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of a task file, or `None` for ids that are not safe file names.
    fn task_path(&self, task_id: &str) -> Option<PathBuf> {
        let safe = !task_id.is_empty()
            && task_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        safe.then(|| self.directory.join(format!("{}.json", task_id)))
    }

    fn lock_for(&self, task_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn read_task(&self, task_id: &str) -> A2aResult<Task> {
        let path = self
            .task_path(task_id)
            .ok_or_else(|| A2aError::task_not_found(task_id))?;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(A2aError::task_not_found(task_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_task(&self, task: &Task) -> A2aResult<()> {
        let path = self
            .task_path(&task.id)
            .ok_or_else(|| A2aError::internal_error(format!("Unsafe task id: {}", task.id)))?;
        let content = serde_json::to_string_pretty(task)?;

        // Write atomically using temp file + rename (blocking I/O)
        let temp_path = path.with_extension("json.tmp");
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            std::fs::write(&temp_path, &content)?;
            std::fs::rename(&temp_path, &target)?;
            Ok(())
        })
        .await
        .map_err(|e| A2aError::internal_error(format!("Task join error: {}", e)))??;

        debug!(task_id = %task.id, path = %path.display(), "Saved task to file");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn create(&self, initial: Message) -> A2aResult<Task> {
        let _guard = self.create_lock.lock().await;
        loop {
            let task = Task::new(Uuid::new_v4().to_string(), initial.clone());
            let Some(path) = self.task_path(&task.id) else {
                continue;
            };
            if tokio::fs::try_exists(&path).await? {
                continue;
            }
            self.write_task(&task).await?;
            return Ok(task);
        }
    }

    async fn get(&self, task_id: &str) -> A2aResult<Task> {
        self.read_task(task_id).await
    }

    async fn update(&self, task_id: &str, mutator: TaskMutator) -> A2aResult<Task> {
        let lock = self.lock_for(task_id);
        let _guard = lock.lock().await;

        let current = self.read_task(task_id).await?;
        let mut next = current.clone();
        mutator(&mut next)?;
        check_update(&current, &next)?;

        self.write_task(&next).await?;
        Ok(next)
    }

    async fn list(&self) -> A2aResult<Vec<Task>> {
        let mut tasks = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.directory).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<Task>(&content) {
                    Ok(task) => tasks.push(task),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to parse task file");
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read task file");
                }
            }
        }

        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn evict_terminal(&self, cutoff: DateTime<Utc>) -> A2aResult<usize> {
        let mut evicted = 0;
        for task in self.list().await? {
            if !(task.is_terminal() && task.updated_at.is_some_and(|at| at < cutoff)) {
                continue;
            }
            let lock = self.lock_for(&task.id);
            let guard = lock.lock().await;
            if let Some(path) = self.task_path(&task.id) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => evicted += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            drop(guard);
            self.locks.remove(&task.id);
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStoreExt;
    use crate::types::TaskState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_basic() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTaskStore::new(temp_dir.path()).unwrap();

        let task = store.create(Message::user("persist me")).await.unwrap();
        let loaded = store.get(&task.id).await.unwrap();
        assert_eq!(loaded.id, task.id);
        assert_eq!(loaded.last_user_text().as_deref(), Some("persist me"));

        assert!(temp_dir.path().join(format!("{}.json", task.id)).exists());
    }

    #[tokio::test]
    async fn test_file_store_persistence() {
        let temp_dir = TempDir::new().unwrap();

        let task_id = {
            let store = FileTaskStore::new(temp_dir.path()).unwrap();
            let task = store.create(Message::user("x")).await.unwrap();
            store
                .update_with(&task.id, |t| {
                    t.transition(TaskState::Working)?;
                    t.complete("done")
                })
                .await
                .unwrap();
            task.id
        };

        let store = FileTaskStore::new(temp_dir.path()).unwrap();
        let loaded = store.get(&task_id).await.unwrap();
        assert_eq!(loaded.state, TaskState::Completed);
        assert_eq!(loaded.last_agent_text().as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTaskStore::new(temp_dir.path()).unwrap();

        let err = store.get("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, A2aError::TaskNotFound { .. }));
    }

    #[tokio::test]
    async fn test_file_store_concurrent_updates() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileTaskStore::new(temp_dir.path()).unwrap());
        let task = store.create(Message::user("x")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            let id = task.id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_with(&id, move |t| {
                        t.add_message(Message::agent(format!("note {}", i)));
                        Ok(())
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get(&task.id).await.unwrap().history.len(), 21);
    }

    #[tokio::test]
    async fn test_file_store_list_and_evict() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTaskStore::new(temp_dir.path()).unwrap();

        let keep = store.create(Message::user("keep")).await.unwrap();
        let drop_me = store.create(Message::user("drop")).await.unwrap();
        store
            .update_with(&drop_me.id, |t| {
                t.transition(TaskState::Working)?;
                t.fail("boom")
            })
            .await
            .unwrap();

        assert_eq!(store.list().await.unwrap().len(), 2);

        let evicted = store
            .evict_terminal(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(evicted, 1);
        assert!(store.get(&keep.id).await.is_ok());
        assert!(store.get(&drop_me.id).await.is_err());
    }
}
