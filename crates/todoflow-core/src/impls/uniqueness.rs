//! RepositoryUniquenessChecker - title index を引いて一意性を確認

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{DomainError, TodoTitle};
use crate::ports::{TodoRepository, UniquenessChecker, UniquenessError};

pub struct RepositoryUniquenessChecker {
    todos: Arc<dyn TodoRepository>,
}

impl RepositoryUniquenessChecker {
    pub fn new(todos: Arc<dyn TodoRepository>) -> Self {
        Self { todos }
    }
}

#[async_trait]
impl UniquenessChecker for RepositoryUniquenessChecker {
    async fn ensure_unique(&self, title: &TodoTitle) -> Result<(), UniquenessError> {
        match self.todos.get_by_title(title).await? {
            Some(existing) => {
                tracing::debug!(todo_id = %existing.id(), title = %title, "title already taken");
                Err(DomainError::TitleAlreadyExists(title.to_string()).into())
            }
            None => Ok(()),
        }
    }
}
