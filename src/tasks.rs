// src/tasks.rs

use std::collections::HashMap;

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use chrono::{DateTime as ChronoDateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::board::{self, ViewMode};
use crate::board_server::TaskChanged;
use crate::error::TaskError;
use crate::models::task::{CreateTaskRequest, Task, TaskPriority, TaskStatus, UpdateTaskRequest};
use crate::models::user::PublicUser;

/// A comment as clients see it, with the author expanded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub user: Option<PublicUser>,
    pub content: String,
    pub created_at: ChronoDateTime<Utc>,
}

/// A task as clients see it. User ids are expanded to public user
/// objects; references that no longer resolve come back as null.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    pub deadline: Option<ChronoDateTime<Utc>>,
    pub created_by: Option<PublicUser>,
    pub assigned_to: Option<PublicUser>,
    pub comments: Vec<CommentResponse>,
    pub created_at: ChronoDateTime<Utc>,
    pub updated_at: ChronoDateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BoardColumnResponse {
    pub status: TaskStatus,
    pub tasks: Vec<TaskResponse>,
}

fn to_chrono(value: mongodb::bson::DateTime) -> ChronoDateTime<Utc> {
    ChronoDateTime::<Utc>::from_timestamp_millis(value.timestamp_millis())
        .unwrap_or(ChronoDateTime::<Utc>::UNIX_EPOCH)
}

/// Every user id a task references, for batch lookup.
fn task_user_ids(task: &Task) -> Vec<String> {
    let mut ids = vec![task.creator_id.clone()];
    if let Some(assignee_id) = &task.assignee_id {
        ids.push(assignee_id.clone());
    }
    for comment in &task.comments {
        ids.push(comment.author_id.clone());
    }
    ids
}

impl TaskResponse {
    pub fn from_task(task: Task, users: &HashMap<String, PublicUser>) -> TaskResponse {
        TaskResponse {
            id: task.task_id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            deadline: task.deadline.map(to_chrono),
            created_by: users.get(&task.creator_id).cloned(),
            assigned_to: task
                .assignee_id
                .as_ref()
                .and_then(|id| users.get(id))
                .cloned(),
            comments: task
                .comments
                .into_iter()
                .map(|comment| CommentResponse {
                    user: users.get(&comment.author_id).cloned(),
                    content: comment.content,
                    created_at: to_chrono(comment.created_at),
                })
                .collect(),
            created_at: to_chrono(task.created_at),
            updated_at: to_chrono(task.updated_at),
        }
    }
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({ "message": "Authentication required" }))
}

async fn expand_one(data: &AppState, task: Task) -> Result<TaskResponse, TaskError> {
    let users = data.users.lookup_many(task_user_ids(&task)).await?;
    Ok(TaskResponse::from_task(task, &users))
}

async fn expand_many(data: &AppState, tasks: Vec<Task>) -> Result<Vec<TaskResponse>, TaskError> {
    let ids = tasks.iter().flat_map(task_user_ids);
    let users = data.users.lookup_many(ids).await?;
    Ok(tasks
        .into_iter()
        .map(|task| TaskResponse::from_task(task, &users))
        .collect())
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    #[serde(rename = "viewMode", default)]
    pub view_mode: ViewMode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    pub content: String,
}

/// GET /tasks?viewMode=team|personal
pub async fn list_tasks(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<ViewQuery>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return Ok(unauthorized()),
    };
    let tasks = data.tasks.list().await?;
    let scoped = board::scope(tasks, query.view_mode, &actor_id);
    let responses = expand_many(&data, scoped).await?;
    Ok(HttpResponse::Ok().json(responses))
}

/// GET /tasks/board?viewMode=team|personal
///
/// The same list, pre-partitioned into the four status columns in board
/// order. Empty columns are included.
pub async fn get_board(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<ViewQuery>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return Ok(unauthorized()),
    };
    let tasks = data.tasks.list().await?;
    let scoped = board::scope(tasks, query.view_mode, &actor_id);
    let view = board::project(scoped);

    let ids: Vec<String> = view
        .columns
        .iter()
        .flat_map(|column| column.tasks.iter().flat_map(task_user_ids))
        .collect();
    let users = data.users.lookup_many(ids).await?;
    let columns: Vec<BoardColumnResponse> = view
        .columns
        .into_iter()
        .map(|column| BoardColumnResponse {
            status: column.status,
            tasks: column
                .tasks
                .into_iter()
                .map(|task| TaskResponse::from_task(task, &users))
                .collect(),
        })
        .collect();
    Ok(HttpResponse::Ok().json(columns))
}

/// POST /tasks
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return Ok(unauthorized()),
    };
    let task = data.tasks.create(&actor_id, payload.into_inner()).await?;
    info!("Task created: {} by {}", task.task_id, actor_id);
    data.board_server.do_send(TaskChanged {
        task_id: task.task_id.clone(),
        action: "created",
    });
    let response = expand_one(&data, task).await?;
    Ok(HttpResponse::Created().json(response))
}

/// GET /tasks/{id}
pub async fn get_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, TaskError> {
    if req.extensions().get::<String>().is_none() {
        return Ok(unauthorized());
    }
    let task = data.tasks.get(&path.into_inner()).await?;
    let response = expand_one(&data, task).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// PUT /tasks/{id}
pub async fn update_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return Ok(unauthorized()),
    };
    let task_id = path.into_inner();
    let task = data
        .tasks
        .edit(&task_id, &actor_id, payload.into_inner())
        .await?;
    data.board_server.do_send(TaskChanged {
        task_id: task_id.clone(),
        action: "updated",
    });
    let response = expand_one(&data, task).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// PATCH /tasks/{id}/status
pub async fn update_task_status(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return Ok(unauthorized()),
    };
    let task_id = path.into_inner();
    let task = data
        .tasks
        .set_status(&task_id, &actor_id, &payload.status)
        .await?;
    info!("Task {} moved to {}", task_id, task.status.as_str());
    data.board_server.do_send(TaskChanged {
        task_id: task_id.clone(),
        action: "status",
    });
    let response = expand_one(&data, task).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /tasks/{id}/comments
pub async fn add_comment(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<CommentRequest>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return Ok(unauthorized()),
    };
    let task_id = path.into_inner();
    let task = data
        .tasks
        .append_comment(&task_id, &actor_id, &payload.content)
        .await?;
    data.board_server.do_send(TaskChanged {
        task_id: task_id.clone(),
        action: "comment",
    });
    let response = expand_one(&data, task).await?;
    Ok(HttpResponse::Created().json(response))
}

/// DELETE /tasks/{id}
pub async fn delete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, TaskError> {
    let actor_id = match req.extensions().get::<String>() {
        Some(uid) => uid.clone(),
        None => return Ok(unauthorized()),
    };
    let task_id = path.into_inner();
    data.tasks.delete(&task_id, &actor_id).await?;
    info!("Task deleted: {} by {}", task_id, actor_id);
    data.board_server.do_send(TaskChanged {
        task_id: task_id.clone(),
        action: "deleted",
    });
    Ok(HttpResponse::Ok().json(json!({
        "message": "Task deleted successfully",
        "taskId": task_id,
    })))
}
