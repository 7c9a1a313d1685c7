//! UniquenessChecker port - 集約をまたぐ不変条件（タイトルの一意性）

use async_trait::async_trait;
use thiserror::Error;

use super::kv_store::StorageError;
use crate::domain::{DomainError, TodoTitle};

#[derive(Debug, Error)]
pub enum UniquenessError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[async_trait]
pub trait UniquenessChecker: Send + Sync {
    /// Fails with `DomainError::TitleAlreadyExists` when a live todo holds the
    /// same normalized title.
    async fn ensure_unique(&self, title: &TodoTitle) -> Result<(), UniquenessError>;
}
