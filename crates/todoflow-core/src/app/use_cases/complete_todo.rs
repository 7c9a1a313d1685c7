//! CompleteTodo

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::load_existing;
use crate::app::context::TodoTx;
use crate::app::dto::TodoDto;
use crate::app::errors::{CommandError, Operation, Swallowable};
use crate::app::pipeline::Handler;
use crate::domain::{ActorContext, TodoId};
use crate::ports::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteTodoInput {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompleteTodoResponse {
    Completed { todo: TodoDto },
    AlreadyCompleted { todo: TodoDto },
}

impl Swallowable for CompleteTodoResponse {}

pub struct CompleteTodo {
    tx: TodoTx,
    clock: Arc<dyn Clock>,
}

impl CompleteTodo {
    pub fn new(tx: TodoTx, clock: Arc<dyn Clock>) -> Self {
        Self { tx, clock }
    }
}

#[async_trait]
impl Handler<CompleteTodoInput, CompleteTodoResponse> for CompleteTodo {
    async fn handle(
        &self,
        input: CompleteTodoInput,
        _actor: &ActorContext,
    ) -> Result<CompleteTodoResponse, CommandError> {
        let id = TodoId::new(input.id)?;
        let mut todo = load_existing(&self.tx, &id, Operation::CompleteTodo).await?;

        if !todo.complete(self.clock.now()) {
            return Ok(CompleteTodoResponse::AlreadyCompleted {
                todo: TodoDto::from(&todo),
            });
        }
        self.tx.save_and_publish(&mut todo).await?;

        Ok(CompleteTodoResponse::Completed {
            todo: TodoDto::from(&todo),
        })
    }
}
