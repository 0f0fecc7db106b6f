// src/memory_store.rs
//
// A hash map behind the same trait the Mongo adapter implements, so
// coordinator behavior can be exercised without a running database.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use mongodb::bson::DateTime;

use crate::models::task::{Comment, Task, TaskPatch, TaskStatus};
use crate::task_store::{PatchOutcome, StoreError, TaskStore};

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> StoreError {
        StoreError("task table lock poisoned".to_string())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_err())?;
        tasks.insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn fetch(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_err())?;
        Ok(tasks.get(task_id).cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_err())?;
        let mut all: Vec<Task> = tasks.values().cloned().collect();
        // Newest first, ties broken by id so the order is deterministic.
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        Ok(all)
    }

    async fn set_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        at: DateTime,
    ) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_err())?;
        Ok(tasks.get_mut(task_id).map(|task| {
            task.status = status;
            task.updated_at = at;
            task.clone()
        }))
    }

    async fn push_comment(
        &self,
        task_id: &str,
        comment: &Comment,
        at: DateTime,
    ) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_err())?;
        Ok(tasks.get_mut(task_id).map(|task| {
            task.comments.push(comment.clone());
            task.updated_at = at;
            task.clone()
        }))
    }

    async fn apply_patch(
        &self,
        task_id: &str,
        expected_version: i64,
        patch: &TaskPatch,
        at: DateTime,
    ) -> Result<PatchOutcome, StoreError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_err())?;
        let Some(task) = tasks.get_mut(task_id) else {
            return Ok(PatchOutcome::Missing);
        };
        if task.version != expected_version {
            return Ok(PatchOutcome::VersionMismatch);
        }
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = Some(description.clone());
        }
        if let Some(deadline) = &patch.deadline {
            task.deadline = Some(*deadline);
        }
        if let Some(priority) = &patch.priority {
            task.priority = Some(*priority);
        }
        if let Some(status) = &patch.status {
            task.status = *status;
        }
        if let Some(assignee_id) = &patch.assignee_id {
            task.assignee_id = Some(assignee_id.clone());
        }
        task.updated_at = at;
        task.version += 1;
        Ok(PatchOutcome::Updated(task.clone()))
    }

    async fn remove(&self, task_id: &str) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_err())?;
        Ok(tasks.remove(task_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::CreateTaskRequest;

    fn seeded_task(title: &str, creator: &str) -> Task {
        CreateTaskRequest {
            title: title.to_string(),
            description: None,
            deadline: None,
            priority: None,
            status: None,
        }
        .into_task(creator)
        .unwrap()
    }

    #[tokio::test]
    async fn guarded_patch_detects_a_stale_version() {
        let store = InMemoryTaskStore::new();
        let task = seeded_task("t", "u-1");
        store.insert(&task).await.unwrap();

        let patch = TaskPatch {
            title: Some("first".to_string()),
            ..TaskPatch::default()
        };
        let first = store
            .apply_patch(&task.task_id, 0, &patch, DateTime::now())
            .await
            .unwrap();
        match first {
            PatchOutcome::Updated(updated) => assert_eq!(updated.version, 1),
            other => panic!("expected update, got {:?}", other),
        }

        // Same expected version again: the write must be refused.
        let second = store
            .apply_patch(&task.task_id, 0, &patch, DateTime::now())
            .await
            .unwrap();
        assert_eq!(second, PatchOutcome::VersionMismatch);

        // Refetch for the current version and the retry goes through.
        let current = store.fetch(&task.task_id).await.unwrap().unwrap();
        let retry = store
            .apply_patch(&task.task_id, current.version, &patch, DateTime::now())
            .await
            .unwrap();
        assert!(matches!(retry, PatchOutcome::Updated(_)));
    }

    #[tokio::test]
    async fn guarded_patch_reports_missing_tasks() {
        let store = InMemoryTaskStore::new();
        let outcome = store
            .apply_patch("no-such-task", 0, &TaskPatch::default(), DateTime::now())
            .await
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Missing);
    }

    #[tokio::test]
    async fn remove_reports_whether_anything_was_deleted() {
        let store = InMemoryTaskStore::new();
        let task = seeded_task("t", "u-1");
        store.insert(&task).await.unwrap();
        assert!(store.remove(&task.task_id).await.unwrap());
        assert!(!store.remove(&task.task_id).await.unwrap());
    }

    #[tokio::test]
    async fn fetch_all_returns_newest_first() {
        let store = InMemoryTaskStore::new();
        let mut older = seeded_task("older", "u-1");
        older.created_at = DateTime::from_millis(1_000);
        let mut newer = seeded_task("newer", "u-1");
        newer.created_at = DateTime::from_millis(2_000);
        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();

        let all = store.fetch_all().await.unwrap();
        let titles: Vec<&str> = all.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }
}
