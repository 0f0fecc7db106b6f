// src/models/task.rs

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldError, TaskError};

/// Lifecycle states a task can sit in. There is no transition graph; any
/// state can move to any other in a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Backlog,
    #[serde(rename = "In Progress")]
    InProgress,
    Blocked,
    Complete,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Backlog,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Backlog => "Backlog",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Complete => "Complete",
        }
    }

    /// Exact-match parse; anything outside the four labels is rejected.
    pub fn parse(value: &str) -> Option<TaskStatus> {
        match value {
            "Backlog" => Some(TaskStatus::Backlog),
            "In Progress" => Some(TaskStatus::InProgress),
            "Blocked" => Some(TaskStatus::Blocked),
            "Complete" => Some(TaskStatus::Complete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<TaskPriority> {
        match value {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

/// One entry in a task's append-only comment ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime,
}

impl Comment {
    /// Builds a timestamped comment, rejecting empty or whitespace-only text.
    pub fn new(author_id: &str, content: &str) -> Result<Comment, TaskError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(TaskError::invalid_field(
                "content",
                "Comment content is required",
            ));
        }
        Ok(Comment {
            author_id: author_id.to_string(),
            content: trimmed.to_string(),
            created_at: DateTime::now(),
        })
    }
}

/// A stored task. `version` is bumped only by full edits; targeted status
/// and comment writes leave it alone so they never invalidate an edit
/// already in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub task_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<DateTime>,
    pub creator_id: String,
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    #[serde(default)]
    pub version: i64,
}

impl Task {
    pub fn ensure_creator(&self, actor_id: &str, action: &str) -> Result<(), TaskError> {
        if self.creator_id != actor_id {
            return Err(TaskError::Authorization(format!(
                "Not authorized to {} this task",
                action
            )));
        }
        Ok(())
    }
}

/// Request payload for creating a task. Unknown keys are rejected rather
/// than silently dropped.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

impl CreateTaskRequest {
    /// Validates every field, collecting all failures before reporting any.
    pub fn into_task(self, creator_id: &str) -> Result<Task, TaskError> {
        let mut errors = Vec::new();

        let title = self.title.trim().to_string();
        if title.is_empty() {
            errors.push(FieldError::new("title", "Title is required"));
        }

        let status = match self.status.as_deref() {
            None => TaskStatus::Backlog,
            Some(raw) => match TaskStatus::parse(raw) {
                Some(status) => status,
                None => {
                    errors.push(FieldError::new("status", "Invalid status"));
                    TaskStatus::Backlog
                }
            },
        };

        let priority = match self.priority.as_deref() {
            None => None,
            Some(raw) => match TaskPriority::parse(raw) {
                Some(priority) => Some(priority),
                None => {
                    errors.push(FieldError::new("priority", "Invalid priority"));
                    None
                }
            },
        };

        let deadline = match self.deadline.as_deref() {
            None => None,
            Some(raw) => match parse_deadline(raw) {
                Some(deadline) => Some(deadline),
                None => {
                    errors.push(FieldError::new("deadline", "Invalid deadline format"));
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(TaskError::Validation(errors));
        }

        let now = DateTime::now();
        Ok(Task {
            task_id: Uuid::new_v4().to_string(),
            title,
            description: normalize_description(self.description),
            status,
            priority,
            deadline,
            creator_id: creator_id.to_string(),
            assignee_id: None,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }
}

/// Request payload for a full edit. Absent fields stay untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "assignedTo")]
    pub assignee_id: Option<String>,
}

/// A validated edit, ready to be applied as targeted field writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.assignee_id.is_none()
    }
}

impl UpdateTaskRequest {
    pub fn into_patch(self) -> Result<TaskPatch, TaskError> {
        let mut errors = Vec::new();
        let mut patch = TaskPatch::default();

        if let Some(raw) = self.title {
            let title = raw.trim().to_string();
            if title.is_empty() {
                errors.push(FieldError::new("title", "Title is required"));
            } else {
                patch.title = Some(title);
            }
        }
        if let Some(raw) = self.status.as_deref() {
            match TaskStatus::parse(raw) {
                Some(status) => patch.status = Some(status),
                None => errors.push(FieldError::new("status", "Invalid status")),
            }
        }
        if let Some(raw) = self.priority.as_deref() {
            match TaskPriority::parse(raw) {
                Some(priority) => patch.priority = Some(priority),
                None => errors.push(FieldError::new("priority", "Invalid priority")),
            }
        }
        if let Some(raw) = self.deadline.as_deref() {
            match parse_deadline(raw) {
                Some(deadline) => patch.deadline = Some(deadline),
                None => errors.push(FieldError::new("deadline", "Invalid deadline format")),
            }
        }
        if let Some(description) = self.description {
            patch.description = Some(description);
        }
        if let Some(assignee_id) = self.assignee_id {
            patch.assignee_id = Some(assignee_id);
        }

        if !errors.is_empty() {
            return Err(TaskError::Validation(errors));
        }
        if patch.is_empty() {
            return Err(TaskError::invalid_field("body", "No fields to update"));
        }
        Ok(patch)
    }
}

/// Accepts full RFC 3339 timestamps and bare `YYYY-MM-DD` dates, the two
/// shapes the clients actually send.
fn parse_deadline(raw: &str) -> Option<DateTime> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(DateTime::from_millis(parsed.timestamp_millis()));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_millis(naive.and_utc().timestamp_millis()))
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn minimal_request(title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: None,
            deadline: None,
            priority: None,
            status: None,
        }
    }

    #[test]
    fn create_defaults_to_backlog() {
        let task = minimal_request("Ship v1").into_task("u-1").unwrap();
        assert_eq!(task.status, TaskStatus::Backlog);
        assert_eq!(task.creator_id, "u-1");
        assert_eq!(task.title, "Ship v1");
        assert!(task.comments.is_empty());
        assert_eq!(task.version, 0);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn create_keeps_an_explicit_status() {
        let task = CreateTaskRequest {
            status: Some("Blocked".to_string()),
            priority: Some("high".to_string()),
            ..minimal_request("t")
        }
        .into_task("u-1")
        .unwrap();
        assert_eq!(task.status, TaskStatus::Blocked);
        assert_eq!(task.priority, Some(TaskPriority::High));
    }

    #[test]
    fn title_whitespace_is_trimmed() {
        let task = minimal_request("  Ship v1  ").into_task("u-1").unwrap();
        assert_eq!(task.title, "Ship v1");
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = minimal_request("   ").into_task("u-1").unwrap_err();
        match err {
            TaskError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "title");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn all_bad_fields_are_reported_together() {
        let request = CreateTaskRequest {
            title: "".to_string(),
            description: None,
            deadline: Some("next tuesday".to_string()),
            priority: Some("urgent".to_string()),
            status: Some("Done".to_string()),
        };
        let err = request.into_task("u-1").unwrap_err();
        match err {
            TaskError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["title", "status", "priority", "deadline"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[rstest]
    #[case("Backlog", TaskStatus::Backlog)]
    #[case("In Progress", TaskStatus::InProgress)]
    #[case("Blocked", TaskStatus::Blocked)]
    #[case("Complete", TaskStatus::Complete)]
    fn the_four_status_labels_parse(#[case] raw: &str, #[case] expected: TaskStatus) {
        assert_eq!(TaskStatus::parse(raw), Some(expected));
        assert_eq!(expected.as_str(), raw);
    }

    #[rstest]
    #[case("Done")]
    #[case("backlog")]
    #[case("IN PROGRESS")]
    #[case("")]
    fn anything_else_is_not_a_status(#[case] raw: &str) {
        assert_eq!(TaskStatus::parse(raw), None);
    }

    #[test]
    fn in_progress_serializes_with_the_space() {
        let value = serde_json::to_value(TaskStatus::InProgress).unwrap();
        assert_eq!(value, "In Progress");
        let parsed: TaskStatus = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, TaskStatus::InProgress);
    }

    #[test]
    fn deadline_accepts_both_client_shapes() {
        let full = minimal_request("t");
        let task = CreateTaskRequest {
            deadline: Some("2026-03-25T10:30:00Z".to_string()),
            ..full
        }
        .into_task("u-1")
        .unwrap();
        assert!(task.deadline.is_some());

        let date_only = CreateTaskRequest {
            deadline: Some("2026-03-25".to_string()),
            ..minimal_request("t")
        }
        .into_task("u-1")
        .unwrap();
        assert!(date_only.deadline.is_some());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = serde_json::from_value::<CreateTaskRequest>(serde_json::json!({
            "title": "Ship v1",
            "sprint": 4,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn comment_text_is_required() {
        assert!(Comment::new("u-2", "").is_err());
        assert!(Comment::new("u-2", "   \n\t").is_err());
        let comment = Comment::new("u-2", "  looks good  ").unwrap();
        assert_eq!(comment.content, "looks good");
        assert_eq!(comment.author_id, "u-2");
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = UpdateTaskRequest::default().into_patch().unwrap_err();
        match err {
            TaskError::Validation(errors) => assert_eq!(errors[0].message, "No fields to update"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn update_maps_assigned_to() {
        let request: UpdateTaskRequest = serde_json::from_value(serde_json::json!({
            "assignedTo": "u-7",
        }))
        .unwrap();
        let patch = request.into_patch().unwrap();
        assert_eq!(patch.assignee_id.as_deref(), Some("u-7"));
        assert!(patch.title.is_none());
    }

    #[test]
    fn update_rejects_invalid_status_without_applying_the_rest() {
        let request = UpdateTaskRequest {
            title: Some("New title".to_string()),
            status: Some("Done".to_string()),
            ..UpdateTaskRequest::default()
        };
        assert!(request.into_patch().is_err());
    }

    #[test]
    fn creator_gate() {
        let task = minimal_request("t").into_task("u-1").unwrap();
        assert!(task.ensure_creator("u-1", "update").is_ok());
        let err = task.ensure_creator("u-2", "delete").unwrap_err();
        match err {
            TaskError::Authorization(message) => {
                assert_eq!(message, "Not authorized to delete this task");
            }
            other => panic!("expected authorization error, got {:?}", other),
        }
    }

    #[test]
    fn stored_task_keys_on_underscore_id() {
        let task = minimal_request("t").into_task("u-1").unwrap();
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("_id").is_some());
        assert!(value.get("task_id").is_none());
        assert_eq!(value["status"], "Backlog");
    }
}
