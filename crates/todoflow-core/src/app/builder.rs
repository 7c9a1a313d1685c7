//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 構成
//! - 各コマンドは `permission -> observability -> Transactional -> use case` の Pipeline
//! - use case は Tx ごとに組み立て直す（Tx の外に repository を持ち出さない）
//! - live な購読者は `InMemoryEventBus` に登録し、OutboxProcessor 経由で配送される
//!
//! # Fail-fast
//! store と clock は必須です。足りなければ `build()` が BuildError を返します。
//! それ以外（id 生成、metrics、event bus、設定）は既定値で埋めます。

use std::sync::Arc;

use super::context::{TodoTx, todo_unit_of_work};
use super::errors::{Operation, Swallowable};
use super::middleware::{ObservabilityMiddleware, PermissionMiddleware, Transactional};
use super::outbox_processor::{OutboxLoop, OutboxProcessor};
use super::pipeline::{Handler, Pipeline};
use super::use_cases::*;
use crate::config::TodoflowConfig;
use crate::domain::Permission;
use crate::impls::{
    InMemoryEventBus, InMemoryKvStore, KvOutboxRepository, KvTodoRepository, RecorderMetrics,
};
use crate::observability::OutboxCounts;
use crate::ports::{
    Clock, IdGenerator, KeyValueStore, Metrics, OutboxRepository, StorageError, SystemClock,
    UlidGenerator,
};

/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .store(Arc::new(InMemoryKvStore::new()))
///     .clock(Arc::new(SystemClock))
///     .config(TodoflowConfig::from_env())
///     .build()?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    metrics: Option<Arc<dyn Metrics>>,
    events: Option<InMemoryEventBus>,
    config: TodoflowConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing collaborator '{0}'; call AppBuilder::{0}() before build()")]
    MissingCollaborator(&'static str),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh in-memory store and the system clock.
    pub fn in_memory() -> Self {
        Self::new()
            .store(Arc::new(InMemoryKvStore::new()))
            .clock(Arc::new(SystemClock))
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Bus that live subscribers are registered on. Shared by clone.
    pub fn event_bus(mut self, events: InMemoryEventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(mut self, config: TodoflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let store = self.store.ok_or(BuildError::MissingCollaborator("store"))?;
        let clock = self.clock.ok_or(BuildError::MissingCollaborator("clock"))?;
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(RecorderMetrics));
        let events = self.events.unwrap_or_default();
        let config = self.config;

        let uow = Arc::new(todo_unit_of_work(store.clone(), ids));
        let policy = config.title_policy;

        let create_todo = command(
            Transactional::new(uow.clone(), move |tx: TodoTx| CreateTodo::new(tx, policy)),
            Permission::TodoCreate,
            Operation::CreateTodo,
            &metrics,
        );

        let c = clock.clone();
        let complete_todo = command(
            Transactional::new(uow.clone(), move |tx: TodoTx| CompleteTodo::new(tx, c.clone())),
            Permission::TodoUpdate,
            Operation::CompleteTodo,
            &metrics,
        );

        let c = clock.clone();
        let reopen_todo = command(
            Transactional::new(uow.clone(), move |tx: TodoTx| ReopenTodo::new(tx, c.clone())),
            Permission::TodoUpdate,
            Operation::ReopenTodo,
            &metrics,
        );

        let add_label = command(
            Transactional::new(uow.clone(), AddLabel::new),
            Permission::TodoUpdate,
            Operation::AddLabel,
            &metrics,
        );

        let update_content = command(
            Transactional::new(uow.clone(), UpdateContent::new),
            Permission::TodoUpdate,
            Operation::UpdateContent,
            &metrics,
        );

        let c = clock.clone();
        let delete_todo = command(
            Transactional::new(uow, move |tx: TodoTx| DeleteTodo::new(tx, c.clone())),
            Permission::TodoDelete,
            Operation::DeleteTodo,
            &metrics,
        );

        // reads need no transaction
        let list_todos = command(
            ListTodos::new(Arc::new(KvTodoRepository::new(store.clone()))),
            Permission::TodoRead,
            Operation::ListTodos,
            &metrics,
        );

        let outbox: Arc<dyn OutboxRepository> = Arc::new(KvOutboxRepository::new(store));
        let processor = Arc::new(OutboxProcessor::new(
            outbox,
            Arc::new(events.clone()),
            metrics,
            config.outbox.clone(),
        ));

        tracing::debug!(title_policy = ?config.title_policy, "todoflow app built");

        Ok(App {
            create_todo,
            complete_todo,
            reopen_todo,
            add_label,
            update_content,
            delete_todo,
            list_todos,
            outbox: processor,
            events,
            config,
        })
    }
}

fn command<I, O>(
    handler: impl Handler<I, O> + 'static,
    permission: Permission,
    operation: Operation,
    metrics: &Arc<dyn Metrics>,
) -> Pipeline<I, O>
where
    I: Send + 'static,
    O: Swallowable + Send + 'static,
{
    Pipeline::new(handler)
        .with(PermissionMiddleware::new(permission))
        .with(ObservabilityMiddleware::new(operation, metrics.clone()))
}

/// Wired application: one pipeline per command plus the outbox processor.
pub struct App {
    pub create_todo: Pipeline<CreateTodoInput, CreateTodoResponse>,
    pub complete_todo: Pipeline<CompleteTodoInput, CompleteTodoResponse>,
    pub reopen_todo: Pipeline<ReopenTodoInput, ReopenTodoResponse>,
    pub add_label: Pipeline<AddLabelInput, AddLabelResponse>,
    pub update_content: Pipeline<UpdateContentInput, UpdateContentResponse>,
    pub delete_todo: Pipeline<DeleteTodoInput, DeleteTodoResponse>,
    pub list_todos: Pipeline<ListTodosInput, ListTodosResponse>,
    pub outbox: Arc<OutboxProcessor>,
    /// Live subscribers. Only the outbox processor publishes here.
    pub events: InMemoryEventBus,
    pub config: TodoflowConfig,
}

impl App {
    pub async fn outbox_counts(&self) -> Result<OutboxCounts, StorageError> {
        self.outbox.counts().await
    }

    /// Start the background outbox loop at the configured poll interval.
    pub fn spawn_outbox_loop(&self) -> OutboxLoop {
        self.outbox
            .clone()
            .spawn(self.config.outbox.poll_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::errors::ErrorKind;
    use crate::config::TitlePolicy;
    use crate::domain::{ActorContext, TodoEvent};
    use crate::impls::InMemoryMetrics;
    use crate::ports::{EventHandler, FixedClock, HandlerError};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    fn admin() -> ActorContext {
        ActorContext::new("admin", Permission::ALL)
    }

    fn create(id: &str, title: &str) -> CreateTodoInput {
        CreateTodoInput {
            id: id.into(),
            title: title.into(),
            description: None,
            labels: vec![],
        }
    }

    fn app_with(metrics: Arc<InMemoryMetrics>, config: TodoflowConfig) -> App {
        AppBuilder::new()
            .store(Arc::new(InMemoryKvStore::new()))
            .clock(Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            )))
            .metrics(metrics)
            .config(config)
            .build()
            .unwrap()
    }

    #[test]
    fn build_requires_store_and_clock() {
        let missing_store = AppBuilder::new().clock(Arc::new(SystemClock)).build();
        assert!(matches!(
            missing_store,
            Err(BuildError::MissingCollaborator("store"))
        ));

        let missing_clock = AppBuilder::new()
            .store(Arc::new(InMemoryKvStore::new()))
            .build();
        assert!(matches!(
            missing_clock,
            Err(BuildError::MissingCollaborator("clock"))
        ));

        assert!(AppBuilder::in_memory().build().is_ok());
    }

    #[tokio::test]
    async fn every_command_is_guarded_and_observed() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let app = app_with(metrics.clone(), TodoflowConfig::default());
        let guest = ActorContext::guest();

        let denied = app
            .create_todo
            .execute(create("t1", "Buy groceries"), &guest)
            .await
            .unwrap_err();
        assert_eq!(denied.kind, ErrorKind::Forbidden);
        // permission runs outside observability
        assert_eq!(metrics.counter("create_todo_forbidden"), 0);

        app.create_todo
            .execute(create("t1", "Buy groceries"), &admin())
            .await
            .unwrap();
        assert_eq!(metrics.counter("create_todo_success"), 1);
        assert_eq!(metrics.timing_count("create_todo_duration_seconds"), 1);

        let listed = app
            .list_todos
            .execute(ListTodosInput::default(), &admin())
            .await
            .unwrap();
        assert_eq!(listed.todos.len(), 1);
    }

    #[tokio::test]
    async fn title_policy_comes_from_config() {
        let config = TodoflowConfig {
            title_policy: TitlePolicy::ReturnExisting,
            ..TodoflowConfig::default()
        };
        let app = app_with(Arc::new(InMemoryMetrics::new()), config);

        app.create_todo
            .execute(create("t1", "Buy groceries"), &admin())
            .await
            .unwrap();
        let second = app
            .create_todo
            .execute(create("t2", "buy   GROCERIES"), &admin())
            .await
            .unwrap();

        assert!(matches!(second, CreateTodoResponse::AlreadyExists { .. }));
        assert_eq!(second.todo().id, "t1");
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<TodoEvent>>);

    #[async_trait]
    impl EventHandler for Collect {
        async fn handle(&self, event: &TodoEvent) -> Result<(), HandlerError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn subscribers_see_events_only_after_the_outbox_runs() {
        let app = app_with(Arc::new(InMemoryMetrics::new()), TodoflowConfig::default());
        let seen = Arc::new(Collect::default());
        app.events.subscribe(TodoEvent::COMPLETED, seen.clone());

        app.create_todo
            .execute(create("t1", "Buy groceries"), &admin())
            .await
            .unwrap();
        app.complete_todo
            .execute(CompleteTodoInput { id: "t1".into() }, &admin())
            .await
            .unwrap();

        assert!(seen.0.lock().unwrap().is_empty());
        assert_eq!(app.outbox_counts().await.unwrap().pending, 1);

        let report = app.outbox.run_once().await.unwrap();
        assert_eq!(report.published, 1);
        assert_eq!(seen.0.lock().unwrap().len(), 1);
        assert_eq!(app.outbox_counts().await.unwrap().published, 1);
    }
}
