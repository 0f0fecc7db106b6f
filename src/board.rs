// src/board.rs

use serde::Deserialize;

use crate::models::task::{Task, TaskStatus};

/// Column order the board renders in when the caller does not ask for
/// another one.
pub const DEFAULT_COLUMN_ORDER: [TaskStatus; 4] = [
    TaskStatus::Backlog,
    TaskStatus::Blocked,
    TaskStatus::InProgress,
    TaskStatus::Complete,
];

/// Which slice of the task list a reader sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Team,
    Personal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub columns: Vec<BoardColumn>,
}

/// Narrows the task list to what the actor should see. Team mode is the
/// whole list; personal mode keeps only tasks the actor created.
pub fn scope(tasks: Vec<Task>, mode: ViewMode, actor_id: &str) -> Vec<Task> {
    match mode {
        ViewMode::Team => tasks,
        ViewMode::Personal => tasks
            .into_iter()
            .filter(|task| task.creator_id == actor_id)
            .collect(),
    }
}

/// Partitions tasks into the four canonical columns, preserving the
/// relative order they arrived in. Columns with no tasks still appear.
pub fn project(tasks: Vec<Task>) -> BoardView {
    project_with_order(tasks, &DEFAULT_COLUMN_ORDER)
}

/// Same partition with a caller-chosen column order. The order must cover
/// the canonical statuses.
pub fn project_with_order(tasks: Vec<Task>, order: &[TaskStatus]) -> BoardView {
    let mut columns: Vec<BoardColumn> = order
        .iter()
        .map(|status| BoardColumn {
            status: *status,
            tasks: Vec::new(),
        })
        .collect();
    for task in tasks {
        if let Some(column) = columns.iter_mut().find(|column| column.status == task.status) {
            column.tasks.push(task);
        }
    }
    BoardView { columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::Comment;
    use mongodb::bson::DateTime;

    fn task(id: &str, creator: &str, status: TaskStatus, created_ms: i64) -> Task {
        Task {
            task_id: id.to_string(),
            title: format!("task {}", id),
            description: None,
            status,
            priority: None,
            deadline: None,
            creator_id: creator.to_string(),
            assignee_id: None,
            comments: Vec::<Comment>::new(),
            created_at: DateTime::from_millis(created_ms),
            updated_at: DateTime::from_millis(created_ms),
            version: 0,
        }
    }

    #[test]
    fn every_task_lands_in_exactly_one_column() {
        let tasks = vec![
            task("a", "u-1", TaskStatus::Backlog, 30),
            task("b", "u-1", TaskStatus::InProgress, 20),
            task("c", "u-2", TaskStatus::Backlog, 10),
            task("d", "u-2", TaskStatus::Complete, 5),
        ];
        let view = project(tasks.clone());
        let total: usize = view.columns.iter().map(|column| column.tasks.len()).sum();
        assert_eq!(total, tasks.len());
        for column in &view.columns {
            for placed in &column.tasks {
                assert_eq!(placed.status, column.status);
            }
        }
    }

    #[test]
    fn empty_columns_still_appear() {
        let view = project(vec![task("a", "u-1", TaskStatus::Blocked, 1)]);
        let statuses: Vec<TaskStatus> = view.columns.iter().map(|column| column.status).collect();
        assert_eq!(statuses, DEFAULT_COLUMN_ORDER.to_vec());
        assert!(view.columns[0].tasks.is_empty());
        assert_eq!(view.columns[1].tasks.len(), 1);
    }

    #[test]
    fn arrival_order_survives_within_a_column() {
        let tasks = vec![
            task("newest", "u-1", TaskStatus::Backlog, 300),
            task("middle", "u-1", TaskStatus::Backlog, 200),
            task("oldest", "u-1", TaskStatus::Backlog, 100),
        ];
        let view = project(tasks);
        let ids: Vec<&str> = view.columns[0]
            .tasks
            .iter()
            .map(|t| t.task_id.as_str())
            .collect();
        assert_eq!(ids, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn projection_is_idempotent() {
        let tasks = vec![
            task("a", "u-1", TaskStatus::Backlog, 3),
            task("b", "u-2", TaskStatus::Complete, 2),
        ];
        assert_eq!(project(tasks.clone()), project(tasks));
    }

    #[test]
    fn personal_scope_keeps_only_the_actors_tasks() {
        let tasks = vec![
            task("mine", "u-1", TaskStatus::Backlog, 3),
            task("theirs", "u-2", TaskStatus::Backlog, 2),
            task("also-mine", "u-1", TaskStatus::Complete, 1),
        ];
        let scoped = scope(tasks.clone(), ViewMode::Personal, "u-1");
        let ids: Vec<&str> = scoped.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["mine", "also-mine"]);

        let team = scope(tasks, ViewMode::Team, "u-1");
        assert_eq!(team.len(), 3);
    }

    #[test]
    fn scope_composes_with_projection() {
        let tasks = vec![
            task("mine", "u-1", TaskStatus::Blocked, 2),
            task("theirs", "u-2", TaskStatus::Blocked, 1),
        ];
        let view = project(scope(tasks, ViewMode::Personal, "u-1"));
        assert_eq!(view.columns[1].tasks.len(), 1);
        assert_eq!(view.columns[1].tasks[0].task_id, "mine");
    }

    #[test]
    fn caller_chosen_column_order_is_respected() {
        let order = [
            TaskStatus::Complete,
            TaskStatus::InProgress,
            TaskStatus::Blocked,
            TaskStatus::Backlog,
        ];
        let view = project_with_order(vec![task("a", "u-1", TaskStatus::Backlog, 1)], &order);
        assert_eq!(view.columns[0].status, TaskStatus::Complete);
        assert_eq!(view.columns[3].tasks.len(), 1);
    }

    #[test]
    fn view_mode_parses_from_query_values() {
        let personal: ViewMode = serde_json::from_value(serde_json::json!("personal")).unwrap();
        assert_eq!(personal, ViewMode::Personal);
        assert!(serde_json::from_value::<ViewMode>(serde_json::json!("mine")).is_err());
        assert_eq!(ViewMode::default(), ViewMode::Team);
    }
}
