//! Transaction context for todo commands.

use std::sync::Arc;

use super::errors::CommandError;
use crate::domain::Todo;
use crate::impls::kv_outbox::OUTBOX_PREFIX;
use crate::impls::kv_todo_repository::{TITLE_INDEX_PREFIX, TODO_PREFIX};
use crate::impls::{
    KvOutboxRepository, KvTodoRepository, KvUnitOfWork, OutboxEventBus, RepositoryUniquenessChecker,
};
use crate::ports::{
    EventBus, IdGenerator, KeyScope, KeyValueStore, TodoRepository, UniquenessChecker,
};

/// Handles valid for one transaction. Events go to the outbox, not to subscribers.
#[derive(Clone)]
pub struct TodoTx {
    pub todos: Arc<dyn TodoRepository>,
    pub events: Arc<dyn EventBus>,
    pub uniqueness: Arc<dyn UniquenessChecker>,
}

impl TodoTx {
    /// Wire repository, outbox bus and uniqueness checker over one store.
    pub fn over(store: Arc<dyn KeyValueStore>, ids: Arc<dyn IdGenerator>) -> Self {
        let todos: Arc<dyn TodoRepository> = Arc::new(KvTodoRepository::new(store.clone()));
        let outbox = Arc::new(KvOutboxRepository::new(store));
        Self {
            uniqueness: Arc::new(RepositoryUniquenessChecker::new(todos.clone())),
            events: Arc::new(OutboxEventBus::new(outbox, ids)),
            todos,
        }
    }

    /// Save, then drain and stage the aggregate's events.
    pub async fn save_and_publish(&self, todo: &mut Todo) -> Result<(), CommandError> {
        self.todos.save(todo).await?;
        let events = todo.pull_domain_events();
        self.events.publish(events).await?;
        Ok(())
    }
}

pub type TodoUnitOfWork = KvUnitOfWork<TodoTx>;

/// Every key a todo command may write.
pub fn todo_scopes() -> Vec<KeyScope> {
    vec![
        KeyScope::prefix(TODO_PREFIX),
        KeyScope::prefix(TITLE_INDEX_PREFIX),
        KeyScope::prefix(OUTBOX_PREFIX),
    ]
}

pub fn todo_unit_of_work(
    store: Arc<dyn KeyValueStore>,
    ids: Arc<dyn IdGenerator>,
) -> TodoUnitOfWork {
    KvUnitOfWork::new(store, todo_scopes(), move |kv| TodoTx::over(kv, ids.clone()))
}
