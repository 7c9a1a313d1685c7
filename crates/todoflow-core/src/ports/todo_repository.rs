//! TodoRepository port - 集約の永続化

use async_trait::async_trait;

use super::kv_store::StorageError;
use crate::domain::{Todo, TodoId, TodoTitle};

/// Load/save/delete for the Todo aggregate.
///
/// - `save` is an upsert that fully overwrites the persisted record and keeps the
///   title index in step with it
/// - `delete` is idempotent
/// - `get_by_title` matches on the normalized title and only sees live todos
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn get_by_id(&self, id: &TodoId) -> Result<Option<Todo>, StorageError>;

    async fn get_by_title(&self, title: &TodoTitle) -> Result<Option<Todo>, StorageError>;

    async fn save(&self, todo: &Todo) -> Result<(), StorageError>;

    async fn delete(&self, id: &TodoId) -> Result<(), StorageError>;

    /// All todos, ordered by id.
    async fn list(&self) -> Result<Vec<Todo>, StorageError>;
}
