//! AddLabel

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::load_existing;
use crate::app::context::TodoTx;
use crate::app::dto::TodoDto;
use crate::app::errors::{CommandError, Operation, Swallowable};
use crate::app::pipeline::Handler;
use crate::domain::{ActorContext, Label, TodoId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLabelInput {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddLabelResponse {
    Added { todo: TodoDto },
    AlreadyExists { todo: TodoDto },
}

impl Swallowable for AddLabelResponse {}

pub struct AddLabel {
    tx: TodoTx,
}

impl AddLabel {
    pub fn new(tx: TodoTx) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Handler<AddLabelInput, AddLabelResponse> for AddLabel {
    async fn handle(
        &self,
        input: AddLabelInput,
        _actor: &ActorContext,
    ) -> Result<AddLabelResponse, CommandError> {
        let id = TodoId::new(input.id)?;
        let label = Label::new(&input.label)?;
        let mut todo = load_existing(&self.tx, &id, Operation::AddLabel).await?;

        if !todo.add_label(label)? {
            return Ok(AddLabelResponse::AlreadyExists {
                todo: TodoDto::from(&todo),
            });
        }
        self.tx.save_and_publish(&mut todo).await?;

        Ok(AddLabelResponse::Added {
            todo: TodoDto::from(&todo),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::use_cases::testing::{Fixture, admin};
    use crate::domain::{DomainError, Todo, TodoTitle};
    use crate::ports::{Clock, TodoRepository};

    fn label(raw: &str) -> AddLabelInput {
        AddLabelInput {
            id: "t1".into(),
            label: raw.into(),
        }
    }

    async fn seed(fx: &Fixture, done: bool) {
        let mut todo = Todo::create(
            TodoId::new("t1").unwrap(),
            TodoTitle::new("Buy groceries").unwrap(),
            "",
        );
        if done {
            todo.complete(fx.clock.now());
        }
        fx.tx.todos.save(&todo).await.unwrap();
    }

    #[tokio::test]
    async fn normalized_duplicate_is_already_exists() {
        let fx = Fixture::new();
        seed(&fx, false).await;
        let uc = AddLabel::new(fx.tx.clone());

        let added = uc.handle(label("  Urgent  "), &admin()).await.unwrap();
        assert!(matches!(
            added,
            AddLabelResponse::Added { ref todo } if todo.labels == vec!["urgent"]
        ));
        let before = fx.store.dump().unwrap();

        let again = uc.handle(label("URGENT"), &admin()).await.unwrap();
        assert!(matches!(again, AddLabelResponse::AlreadyExists { .. }));
        assert_eq!(fx.store.dump().unwrap(), before);
    }

    #[tokio::test]
    async fn done_todo_rejects_labels() {
        let fx = Fixture::new();
        seed(&fx, true).await;
        let err = AddLabel::new(fx.tx.clone())
            .handle(label("urgent"), &admin())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Domain(DomainError::Immutable { .. })
        ));
    }

    #[tokio::test]
    async fn short_label_fails_validation() {
        let fx = Fixture::new();
        seed(&fx, false).await;
        let err = AddLabel::new(fx.tx.clone())
            .handle(label(" x "), &admin())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Domain(DomainError::InvalidLabel { .. })
        ));
    }
}
