//! ListTodos - 読み取り専用。トランザクションなしで repository を直接読む

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::app::dto::TodoDto;
use crate::app::errors::{CommandError, Swallowable};
use crate::app::pipeline::Handler;
use crate::domain::ActorContext;
use crate::ports::TodoRepository;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTodosInput {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTodosResponse {
    pub todos: Vec<TodoDto>,
}

impl Swallowable for ListTodosResponse {}

pub struct ListTodos {
    todos: Arc<dyn TodoRepository>,
}

impl ListTodos {
    pub fn new(todos: Arc<dyn TodoRepository>) -> Self {
        Self { todos }
    }
}

#[async_trait]
impl Handler<ListTodosInput, ListTodosResponse> for ListTodos {
    async fn handle(
        &self,
        _input: ListTodosInput,
        _actor: &ActorContext,
    ) -> Result<ListTodosResponse, CommandError> {
        let todos = self.todos.list().await?;
        Ok(ListTodosResponse {
            todos: todos.iter().map(TodoDto::from).collect(),
        })
    }
}
