// src/task_store.rs

use async_trait::async_trait;
use futures_util::StreamExt;
use log::error;
use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use thiserror::Error;

use crate::models::task::{Comment, Task, TaskPatch, TaskStatus};

/// Raised when the backing store misbehaves; the coordinator wraps it
/// before it reaches a client.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// What a guarded full edit did.
#[derive(Debug, PartialEq)]
pub enum PatchOutcome {
    Updated(Task),
    /// The task exists but its version moved on since the caller read it.
    VersionMismatch,
    Missing,
}

/// Storage operations the mutation coordinator needs. Everything that
/// touches an existing task is a targeted write keyed by task id; nothing
/// here reads a document, mutates it in memory and writes it back whole.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: &Task) -> Result<(), StoreError>;
    async fn fetch(&self, task_id: &str) -> Result<Option<Task>, StoreError>;
    /// All tasks, newest first.
    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError>;
    async fn set_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        at: DateTime,
    ) -> Result<Option<Task>, StoreError>;
    async fn push_comment(
        &self,
        task_id: &str,
        comment: &Comment,
        at: DateTime,
    ) -> Result<Option<Task>, StoreError>;
    /// Applies a full edit only if the stored version still matches
    /// `expected_version`, bumping the version on success.
    async fn apply_patch(
        &self,
        task_id: &str,
        expected_version: i64,
        patch: &TaskPatch,
        at: DateTime,
    ) -> Result<PatchOutcome, StoreError>;
    async fn remove(&self, task_id: &str) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct MongoTaskStore {
    tasks: Collection<Task>,
}

impl MongoTaskStore {
    pub fn new(db: &Database) -> Self {
        MongoTaskStore {
            tasks: db.collection::<Task>("tasks"),
        }
    }
}

#[async_trait]
impl TaskStore for MongoTaskStore {
    async fn insert(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks.insert_one(task).await?;
        Ok(())
    }

    async fn fetch(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.find_one(doc! { "_id": task_id }).await?)
    }

    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        let mut cursor = self
            .tasks
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await?;
        let mut tasks = Vec::new();
        while let Some(task_res) = cursor.next().await {
            match task_res {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    error!("Error reading tasks cursor: {}", e);
                    return Err(e.into());
                }
            }
        }
        Ok(tasks)
    }

    async fn set_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        at: DateTime,
    ) -> Result<Option<Task>, StoreError> {
        let update = doc! { "$set": { "status": status.as_str(), "updated_at": at } };
        Ok(self
            .tasks
            .find_one_and_update(doc! { "_id": task_id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn push_comment(
        &self,
        task_id: &str,
        comment: &Comment,
        at: DateTime,
    ) -> Result<Option<Task>, StoreError> {
        let comment_doc = to_bson(comment).map_err(|e| StoreError(e.to_string()))?;
        let update = doc! {
            "$push": { "comments": comment_doc },
            "$set": { "updated_at": at },
        };
        Ok(self
            .tasks
            .find_one_and_update(doc! { "_id": task_id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn apply_patch(
        &self,
        task_id: &str,
        expected_version: i64,
        patch: &TaskPatch,
        at: DateTime,
    ) -> Result<PatchOutcome, StoreError> {
        let mut fields = doc! { "updated_at": at };
        if let Some(title) = &patch.title {
            fields.insert("title", title);
        }
        if let Some(description) = &patch.description {
            fields.insert("description", description);
        }
        if let Some(deadline) = &patch.deadline {
            fields.insert("deadline", *deadline);
        }
        if let Some(priority) = &patch.priority {
            fields.insert("priority", priority.as_str());
        }
        if let Some(status) = &patch.status {
            fields.insert("status", status.as_str());
        }
        if let Some(assignee_id) = &patch.assignee_id {
            fields.insert("assignee_id", assignee_id);
        }

        let filter = doc! { "_id": task_id, "version": expected_version };
        let update = doc! { "$set": fields, "$inc": { "version": 1 } };
        let updated = self
            .tasks
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        match updated {
            Some(task) => Ok(PatchOutcome::Updated(task)),
            // The guarded write matched nothing: either the version moved
            // or the task is gone. One more read tells them apart.
            None => match self.fetch(task_id).await? {
                Some(_) => Ok(PatchOutcome::VersionMismatch),
                None => Ok(PatchOutcome::Missing),
            },
        }
    }

    async fn remove(&self, task_id: &str) -> Result<bool, StoreError> {
        let result = self.tasks.delete_one(doc! { "_id": task_id }).await?;
        Ok(result.deleted_count > 0)
    }
}
