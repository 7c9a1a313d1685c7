//! Flat data shapes returned to callers.

use serde::{Deserialize, Serialize};

use crate::domain::{Todo, TodoStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub labels: Vec<String>,
}

impl From<&Todo> for TodoDto {
    fn from(todo: &Todo) -> Self {
        Self {
            id: todo.id().to_string(),
            title: todo.title().to_string(),
            description: todo.description().to_string(),
            status: todo.status(),
            labels: todo.labels().iter().map(ToString::to_string).collect(),
        }
    }
}
