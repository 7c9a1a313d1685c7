//! KvTodoRepository - KeyValueStore 上の Todo repository
//!
//! # キー
//! - `todo:<id>` -> TodoRecord (JSON)
//! - `todo_title:<正規化タイトル>` -> id（一意性インデックス）

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{Todo, TodoId, TodoRecord, TodoTitle};
use crate::ports::{KeyValueStore, StorageError, TodoRepository};

pub const TODO_PREFIX: &str = "todo:";
pub const TITLE_INDEX_PREFIX: &str = "todo_title:";

pub fn todo_key(id: &TodoId) -> String {
    format!("{TODO_PREFIX}{id}")
}

pub fn title_key(title: &TodoTitle) -> String {
    format!("{TITLE_INDEX_PREFIX}{}", title.uniqueness_key())
}

pub struct KvTodoRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvTodoRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load(&self, key: &str) -> Result<Option<Todo>, StorageError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        let record: TodoRecord = serde_json::from_str(&raw).map_err(|source| StorageError::Codec {
            key: key.to_string(),
            source,
        })?;
        let todo = Todo::from_record(record).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(todo))
    }

    /// Drop the index entry only if it still points at `id`.
    fn release_title(&self, title: &TodoTitle, id: &TodoId) -> Result<(), StorageError> {
        let key = title_key(title);
        if self.store.get(&key)?.as_deref() == Some(id.as_str()) {
            self.store.remove(&key)?;
        }
        Ok(())
    }
}

#[async_trait]
impl TodoRepository for KvTodoRepository {
    async fn get_by_id(&self, id: &TodoId) -> Result<Option<Todo>, StorageError> {
        self.load(&todo_key(id))
    }

    async fn get_by_title(&self, title: &TodoTitle) -> Result<Option<Todo>, StorageError> {
        let Some(raw_id) = self.store.get(&title_key(title))? else {
            return Ok(None);
        };
        let id = TodoId::new(raw_id).map_err(|e| StorageError::Corrupt {
            key: title_key(title),
            reason: e.to_string(),
        })?;
        self.get_by_id(&id).await
    }

    async fn save(&self, todo: &Todo) -> Result<(), StorageError> {
        let key = todo_key(todo.id());
        if let Some(previous) = self.load(&key)?
            && previous.title().uniqueness_key() != todo.title().uniqueness_key()
        {
            self.release_title(previous.title(), todo.id())?;
        }

        let raw = serde_json::to_string(&todo.to_record()).map_err(|source| StorageError::Codec {
            key: key.clone(),
            source,
        })?;
        self.store.set(&title_key(todo.title()), todo.id().to_string())?;
        self.store.set(&key, raw)?;
        tracing::debug!(todo_id = %todo.id(), "todo saved");
        Ok(())
    }

    async fn delete(&self, id: &TodoId) -> Result<(), StorageError> {
        let key = todo_key(id);
        if let Some(existing) = self.load(&key)? {
            self.release_title(existing.title(), id)?;
            self.store.remove(&key)?;
            tracing::debug!(todo_id = %id, "todo removed");
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Todo>, StorageError> {
        let mut todos = Vec::new();
        for key in self.store.keys_with_prefix(TODO_PREFIX)? {
            if let Some(todo) = self.load(&key)? {
                todos.push(todo);
            }
        }
        todos.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(todos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryKvStore;

    fn todo(id: &str, title: &str) -> Todo {
        Todo::create(TodoId::new(id).unwrap(), TodoTitle::new(title).unwrap(), "")
    }

    fn repo() -> (InMemoryKvStore, KvTodoRepository) {
        let store = InMemoryKvStore::new();
        let repo = KvTodoRepository::new(Arc::new(store.clone()));
        (store, repo)
    }

    #[tokio::test]
    async fn save_and_load_by_id_and_title() {
        let (_, repo) = repo();
        let t = todo("t1", "Buy groceries");
        repo.save(&t).await.unwrap();

        assert_eq!(repo.get_by_id(t.id()).await.unwrap(), Some(t.clone()));
        let by_title = repo
            .get_by_title(&TodoTitle::new("buy   GROCERIES").unwrap())
            .await
            .unwrap();
        assert_eq!(by_title.map(|x| x.id().clone()), Some(t.id().clone()));
    }

    #[tokio::test]
    async fn renaming_moves_the_title_index() {
        let (store, repo) = repo();
        let t = todo("t1", "Buy groceries");
        repo.save(&t).await.unwrap();

        let renamed = Todo::from_record(TodoRecord {
            title: TodoTitle::new("Walk the dog").unwrap(),
            ..t.to_record()
        })
        .unwrap();
        repo.save(&renamed).await.unwrap();

        assert!(
            repo.get_by_title(&TodoTitle::new("Buy groceries").unwrap())
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store.keys_with_prefix(TITLE_INDEX_PREFIX).unwrap(),
            vec!["todo_title:walk the dog"]
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_frees_the_title() {
        let (store, repo) = repo();
        let t = todo("t1", "Buy groceries");
        repo.save(&t).await.unwrap();

        repo.delete(t.id()).await.unwrap();
        repo.delete(t.id()).await.unwrap();
        repo.delete(&TodoId::new("never-existed").unwrap()).await.unwrap();

        assert!(repo.get_by_id(t.id()).await.unwrap().is_none());
        assert!(store.dump().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_sorted_by_id() {
        let (_, repo) = repo();
        repo.save(&todo("b", "Second thing")).await.unwrap();
        repo.save(&todo("a", "First thing")).await.unwrap();

        let ids: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn corrupt_record_is_reported() {
        let (store, repo) = repo();
        store.set("todo:bad", "{not json".into()).unwrap();
        let err = repo.get_by_id(&TodoId::new("bad").unwrap()).await.unwrap_err();
        assert!(matches!(err, StorageError::Codec { .. }));
    }
}
