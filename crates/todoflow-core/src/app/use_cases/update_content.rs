//! UpdateContent - title と description をまとめて更新

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::load_existing;
use crate::app::context::TodoTx;
use crate::app::dto::TodoDto;
use crate::app::errors::{CommandError, Operation, Swallowable};
use crate::app::pipeline::Handler;
use crate::domain::{ActorContext, TodoId, TodoTitle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateContentInput {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateContentResponse {
    Updated { todo: TodoDto },
    NoUpdate { todo: TodoDto },
}

impl Swallowable for UpdateContentResponse {}

pub struct UpdateContent {
    tx: TodoTx,
}

impl UpdateContent {
    pub fn new(tx: TodoTx) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Handler<UpdateContentInput, UpdateContentResponse> for UpdateContent {
    async fn handle(
        &self,
        input: UpdateContentInput,
        _actor: &ActorContext,
    ) -> Result<UpdateContentResponse, CommandError> {
        let id = TodoId::new(input.id)?;
        let title = input.title.as_deref().map(TodoTitle::new).transpose()?;
        let mut todo = load_existing(&self.tx, &id, Operation::UpdateContent).await?;

        let mut changed = false;
        if let Some(title) = title {
            changed |= todo.change_title(title, self.tx.uniqueness.as_ref()).await?;
        }
        if let Some(description) = input.description.as_deref() {
            changed |= todo.change_description(description)?;
        }

        if !changed {
            return Ok(UpdateContentResponse::NoUpdate {
                todo: TodoDto::from(&todo),
            });
        }
        self.tx.save_and_publish(&mut todo).await?;

        Ok(UpdateContentResponse::Updated {
            todo: TodoDto::from(&todo),
        })
    }
}
