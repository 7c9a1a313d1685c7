//! ReopenTodo

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
pub struct ReopenTodoInput {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReopenTodoResponse {
    Reopened { todo: TodoDto },
    AlreadyOpen { todo: TodoDto },
}

impl Swallowable for ReopenTodoResponse {}

pub struct ReopenTodo {
    tx: TodoTx,
    clock: Arc<dyn Clock>,
}

impl ReopenTodo {
    pub fn new(tx: TodoTx, clock: Arc<dyn Clock>) -> Self {
        Self { tx, clock }
    }
}

#[async_trait]
impl Handler<ReopenTodoInput, ReopenTodoResponse> for ReopenTodo {
    async fn handle(
        &self,
        input: ReopenTodoInput,
        _actor: &ActorContext,
    ) -> Result<ReopenTodoResponse, CommandError> {
        let id = TodoId::new(input.id)?;
        let mut todo = load_existing(&self.tx, &id, Operation::ReopenTodo).await?;

        if !todo.reopen(self.clock.now()) {
            return Ok(ReopenTodoResponse::AlreadyOpen {
                todo: TodoDto::from(&todo),
            });
        }
        self.tx.save_and_publish(&mut todo).await?;

        Ok(ReopenTodoResponse::Reopened {
            todo: TodoDto::from(&todo),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::use_cases::testing::{Fixture, admin};
    use crate::domain::{Todo, TodoStatus, TodoTitle};
    use crate::ports::TodoRepository;

    #[tokio::test]
    async fn reopen_only_acts_on_done_todos() {
        let fx = Fixture::new();
        let mut todo = Todo::create(
            TodoId::new("t1").unwrap(),
            TodoTitle::new("Buy groceries").unwrap(),
            "",
        );
        fx.tx.todos.save(&todo).await.unwrap();
        let uc = ReopenTodo::new(fx.tx.clone(), fx.clock());
        let input = || ReopenTodoInput { id: "t1".into() };

        let open = uc.handle(input(), &admin()).await.unwrap();
        assert!(matches!(open, ReopenTodoResponse::AlreadyOpen { .. }));
        assert!(fx.staged().await.is_empty());

        todo.complete(fx.clock.now());
        todo.pull_domain_events();
        fx.tx.todos.save(&todo).await.unwrap();

        let reopened = uc.handle(input(), &admin()).await.unwrap();
        assert!(matches!(
            reopened,
            ReopenTodoResponse::Reopened { ref todo } if todo.status == TodoStatus::Pending
        ));
        let staged = fx.staged().await;
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].event_type, "TodoReopened");
    }
}
