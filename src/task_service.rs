// src/task_service.rs

use std::sync::Arc;

use log::error;
use mongodb::bson::DateTime;

use crate::error::TaskError;
use crate::models::task::{Comment, CreateTaskRequest, Task, TaskStatus, UpdateTaskRequest};
use crate::task_store::{PatchOutcome, StoreError, TaskStore};

/// Serializes every task mutation behind one interface. Each operation
/// validates first, then resolves the task, then checks authority, so a
/// bad payload is reported before a missing task and a missing task
/// before a permission failure.
pub struct TaskService<S> {
    store: Arc<S>,
}

impl<S> Clone for TaskService<S> {
    fn clone(&self) -> Self {
        TaskService {
            store: self.store.clone(),
        }
    }
}

impl<S: TaskStore> TaskService<S> {
    pub fn new(store: Arc<S>) -> Self {
        TaskService { store }
    }

    fn store_failure(err: StoreError) -> TaskError {
        error!("Task store failure: {}", err);
        TaskError::infrastructure(err.to_string())
    }

    fn missing() -> TaskError {
        TaskError::not_found("Task not found")
    }

    pub async fn create(
        &self,
        actor_id: &str,
        request: CreateTaskRequest,
    ) -> Result<Task, TaskError> {
        let task = request.into_task(actor_id)?;
        self.store
            .insert(&task)
            .await
            .map_err(Self::store_failure)?;
        Ok(task)
    }

    pub async fn get(&self, task_id: &str) -> Result<Task, TaskError> {
        self.store
            .fetch(task_id)
            .await
            .map_err(Self::store_failure)?
            .ok_or_else(Self::missing)
    }

    pub async fn list(&self) -> Result<Vec<Task>, TaskError> {
        self.store.fetch_all().await.map_err(Self::store_failure)
    }

    /// Full edit, creator only. Guarded by the version the task had when
    /// we read it; a concurrent edit in the gap surfaces as a conflict
    /// the caller resolves by refetching and retrying.
    pub async fn edit(
        &self,
        task_id: &str,
        actor_id: &str,
        request: UpdateTaskRequest,
    ) -> Result<Task, TaskError> {
        let patch = request.into_patch()?;
        let current = self.get(task_id).await?;
        current.ensure_creator(actor_id, "update")?;
        let outcome = self
            .store
            .apply_patch(task_id, current.version, &patch, DateTime::now())
            .await
            .map_err(Self::store_failure)?;
        match outcome {
            PatchOutcome::Updated(task) => Ok(task),
            PatchOutcome::VersionMismatch => Err(TaskError::conflict(
                "Task was modified concurrently, refetch and retry",
            )),
            PatchOutcome::Missing => Err(Self::missing()),
        }
    }

    /// Status move, creator only. Written as a single targeted update so
    /// it can land beside a concurrent comment without clobbering it.
    pub async fn set_status(
        &self,
        task_id: &str,
        actor_id: &str,
        raw_status: &str,
    ) -> Result<Task, TaskError> {
        let status = TaskStatus::parse(raw_status)
            .ok_or_else(|| TaskError::invalid_field("status", "Invalid status"))?;
        let current = self.get(task_id).await?;
        current.ensure_creator(actor_id, "update")?;
        self.store
            .set_status(task_id, status, DateTime::now())
            .await
            .map_err(Self::store_failure)?
            .ok_or_else(Self::missing)
    }

    /// Any authenticated user may comment; the ledger only ever grows.
    pub async fn append_comment(
        &self,
        task_id: &str,
        author_id: &str,
        content: &str,
    ) -> Result<Task, TaskError> {
        let comment = Comment::new(author_id, content)?;
        self.store
            .push_comment(task_id, &comment, comment.created_at)
            .await
            .map_err(Self::store_failure)?
            .ok_or_else(Self::missing)
    }

    pub async fn delete(&self, task_id: &str, actor_id: &str) -> Result<(), TaskError> {
        let current = self.get(task_id).await?;
        current.ensure_creator(actor_id, "delete")?;
        if self
            .store
            .remove(task_id)
            .await
            .map_err(Self::store_failure)?
        {
            Ok(())
        } else {
            // Lost a race with another delete; same answer either way.
            Err(Self::missing())
        }
    }
}
