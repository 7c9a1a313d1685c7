//! DeleteTodo - 存在しない todo の削除は `already_deleted`（no-op 成功）

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::app::context::TodoTx;
use crate::app::errors::{CommandError, Operation, Swallowable};
use crate::app::pipeline::Handler;
use crate::domain::{ActorContext, TodoId};
use crate::ports::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTodoInput {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteTodoResponse {
    Deleted { id: String },
    AlreadyDeleted { id: String },
}

impl Swallowable for DeleteTodoResponse {
    fn from_swallowed(err: &CommandError) -> Option<Self> {
        match err {
            CommandError::NotFound {
                id,
                operation: Operation::DeleteTodo,
                idempotent: true,
            } => Some(DeleteTodoResponse::AlreadyDeleted { id: id.to_string() }),
            _ => None,
        }
    }
}

pub struct DeleteTodo {
    tx: TodoTx,
    clock: Arc<dyn Clock>,
}

impl DeleteTodo {
    pub fn new(tx: TodoTx, clock: Arc<dyn Clock>) -> Self {
        Self { tx, clock }
    }
}

#[async_trait]
impl Handler<DeleteTodoInput, DeleteTodoResponse> for DeleteTodo {
    async fn handle(
        &self,
        input: DeleteTodoInput,
        _actor: &ActorContext,
    ) -> Result<DeleteTodoResponse, CommandError> {
        let id = TodoId::new(input.id)?;
        let Some(mut todo) = self.tx.todos.get_by_id(&id).await? else {
            // the observability layer turns this into `already_deleted`
            return Err(CommandError::already_gone(id, Operation::DeleteTodo));
        };

        // record the event first so it can be staged after the row is gone
        todo.delete(self.clock.now());
        let events = todo.pull_domain_events();
        self.tx.todos.delete(&id).await?;
        self.tx.events.publish(events).await?;

        Ok(DeleteTodoResponse::Deleted { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::use_cases::testing::{Fixture, admin};
    use crate::domain::{Todo, TodoTitle};
    use crate::ports::TodoRepository;

    #[tokio::test]
    async fn delete_removes_row_and_stages_event() {
        let fx = Fixture::new();
        let todo = Todo::create(
            TodoId::new("t1").unwrap(),
            TodoTitle::new("Buy groceries").unwrap(),
            "",
        );
        fx.tx.todos.save(&todo).await.unwrap();

        let out = DeleteTodo::new(fx.tx.clone(), fx.clock())
            .handle(DeleteTodoInput { id: "t1".into() }, &admin())
            .await
            .unwrap();

        assert_eq!(out, DeleteTodoResponse::Deleted { id: "t1".into() });
        assert!(fx.tx.todos.get_by_id(todo.id()).await.unwrap().is_none());
        let staged = fx.staged().await;
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].event_type, "TodoDeleted");
        assert_eq!(staged[0].aggregate_id.as_ref(), Some(todo.id()));
    }

    #[tokio::test]
    async fn missing_todo_is_an_idempotent_not_found() {
        let fx = Fixture::new();
        let err = DeleteTodo::new(fx.tx.clone(), fx.clock())
            .handle(DeleteTodoInput { id: "t1".into() }, &admin())
            .await
            .unwrap_err();

        assert_eq!(
            DeleteTodoResponse::from_swallowed(&err),
            Some(DeleteTodoResponse::AlreadyDeleted { id: "t1".into() })
        );
    }

    #[test]
    fn other_errors_are_not_swallowed() {
        let err = CommandError::not_found(TodoId::new("t1").unwrap(), Operation::DeleteTodo);
        assert_eq!(DeleteTodoResponse::from_swallowed(&err), None);
    }
}
