//! CreateTodo

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::context::TodoTx;
use crate::app::dto::TodoDto;
use crate::app::errors::{CommandError, Swallowable};
use crate::app::pipeline::Handler;
use crate::config::TitlePolicy;
use crate::domain::{ActorContext, Label, Todo, TodoId, TodoTitle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTodoInput {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateTodoResponse {
    Created { todo: TodoDto },
    /// Same id re-issued. Nothing is written.
    TodoIdAlreadyExists { todo: TodoDto },
    /// Another todo holds the title and the policy is `ReturnExisting`.
    AlreadyExists { todo: TodoDto },
}

impl CreateTodoResponse {
    pub fn todo(&self) -> &TodoDto {
        match self {
            CreateTodoResponse::Created { todo }
            | CreateTodoResponse::TodoIdAlreadyExists { todo }
            | CreateTodoResponse::AlreadyExists { todo } => todo,
        }
    }
}

impl Swallowable for CreateTodoResponse {}

pub struct CreateTodo {
    tx: TodoTx,
    title_policy: TitlePolicy,
}

impl CreateTodo {
    pub fn new(tx: TodoTx, title_policy: TitlePolicy) -> Self {
        Self { tx, title_policy }
    }
}

#[async_trait]
impl Handler<CreateTodoInput, CreateTodoResponse> for CreateTodo {
    async fn handle(
        &self,
        input: CreateTodoInput,
        _actor: &ActorContext,
    ) -> Result<CreateTodoResponse, CommandError> {
        // validate everything before touching storage
        let id = TodoId::new(input.id)?;
        let title = TodoTitle::new(&input.title)?;
        let labels = input
            .labels
            .iter()
            .map(Label::new)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(existing) = self.tx.todos.get_by_id(&id).await? {
            return Ok(CreateTodoResponse::TodoIdAlreadyExists {
                todo: TodoDto::from(&existing),
            });
        }

        match self.title_policy {
            TitlePolicy::Reject => self.tx.uniqueness.ensure_unique(&title).await?,
            TitlePolicy::ReturnExisting => {
                if let Some(holder) = self.tx.todos.get_by_title(&title).await? {
                    return Ok(CreateTodoResponse::AlreadyExists {
                        todo: TodoDto::from(&holder),
                    });
                }
            }
        }

        let mut todo = Todo::create(id, title, input.description.unwrap_or_default());
        for label in labels {
            todo.add_label(label)?;
        }
        self.tx.save_and_publish(&mut todo).await?;

        Ok(CreateTodoResponse::Created {
            todo: TodoDto::from(&todo),
        })
    }
}
