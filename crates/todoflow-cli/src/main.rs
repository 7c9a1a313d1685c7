use async_trait::async_trait;
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{Duration, sleep};

use todoflow_core::app::AppBuilder;
use todoflow_core::app::use_cases::{
    AddLabelInput, CompleteTodoInput, CreateTodoInput, DeleteTodoInput, ListTodosInput,
    UpdateContentInput,
};
use todoflow_core::config::TodoflowConfig;
use todoflow_core::domain::{ActorContext, Permission, TodoEvent};
use todoflow_core::impls::InMemoryMetrics;
use todoflow_core::observability::init_tracing;
use todoflow_core::ports::{EventHandler, HandlerError, IdGenerator, SystemClock, UlidGenerator};

/// Prints every event it receives, after failing the first `n` deliveries.
struct NotifyHandler {
    remaining_failures: AtomicU32,
}

impl NotifyHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl EventHandler for NotifyHandler {
    async fn handle(&self, event: &TodoEvent) -> Result<(), HandlerError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(HandlerError::new(format!("intentional failure (left={left})")));
        }

        println!(
            "notify: {} todo={} at={}",
            event.name(),
            event.aggregate_id(),
            event.occurred_on()
        );
        Ok(())
    }
}

fn show(label: &str, value: &impl Serialize) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{label}: {json}"),
        Err(e) => println!("{label}: <unprintable: {e}>"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // (A) 設定とログ
    let config = TodoflowConfig::from_env();
    init_tracing(&config.log);

    // (B) インメモリ構成で App を組み立て、購読者を登録
    let metrics = Arc::new(InMemoryMetrics::new());
    let app = AppBuilder::in_memory()
        .metrics(metrics.clone())
        .config(config)
        .build()?;
    let notify = Arc::new(NotifyHandler::new(1));
    for name in [TodoEvent::COMPLETED, TodoEvent::REOPENED, TodoEvent::DELETED] {
        app.events.subscribe(name, notify.clone());
    }
    let outbox_loop = app.spawn_outbox_loop();

    let admin = ActorContext::new("demo-admin", Permission::ALL).with_roles(["admin"]);
    let guest = ActorContext::guest();

    // (C) コマンドを順に実行
    let todo_id = UlidGenerator::new(SystemClock).generate();
    let created = app
        .create_todo
        .execute(
            CreateTodoInput {
                id: todo_id.clone(),
                title: "Buy groceries".into(),
                description: Some("milk, eggs".into()),
                labels: vec![],
            },
            &admin,
        )
        .await?;
    show("create", &created);

    let labelled = app
        .add_label
        .execute(
            AddLabelInput {
                id: todo_id.clone(),
                label: "  Urgent  ".into(),
            },
            &admin,
        )
        .await?;
    show("add_label", &labelled);

    let completed = app
        .complete_todo
        .execute(CompleteTodoInput { id: todo_id.clone() }, &admin)
        .await?;
    show("complete", &completed);

    // 完了済みの todo は書き換えられない
    match app
        .update_content
        .execute(
            UpdateContentInput {
                id: todo_id.clone(),
                title: None,
                description: Some("x".into()),
            },
            &admin,
        )
        .await
    {
        Ok(updated) => show("update_content", &updated),
        Err(e) => println!("update_content: {} ({})", e.code, e.status_code()),
    }

    if let Err(e) = app
        .delete_todo
        .execute(DeleteTodoInput { id: todo_id.clone() }, &guest)
        .await
    {
        println!("delete as guest: {} ({})", e.code, e.status_code());
    }

    for attempt in 1..=2 {
        let deleted = app
            .delete_todo
            .execute(DeleteTodoInput { id: todo_id.clone() }, &admin)
            .await?;
        show(&format!("delete #{attempt}"), &deleted);
    }

    let listed = app
        .list_todos
        .execute(ListTodosInput::default(), &admin)
        .await?;
    show("list", &listed);

    // (D) outbox が空になるまで待つ（失敗した配送は次の run で再送される）
    loop {
        let counts = app.outbox_counts().await?;
        if counts.pending == 0 {
            show("outbox", &counts);
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    // (E) ループを止めて終了
    outbox_loop.shutdown_and_join().await;
    show("metrics", &metrics.counters());
    Ok(())
}
