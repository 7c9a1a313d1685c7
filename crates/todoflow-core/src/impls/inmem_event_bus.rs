//! InMemoryEventBus - 配送経路の EventBus（購読者への fan-out）
//!
//! # 実装詳細
//! - HashMap<イベント名, Vec<Arc<dyn EventHandler>>> で購読者を管理
//! - Mutex で排他制御。handler を await する前に Vec を clone してロックを手放す
//! - 1 つの handler が失敗しても残りの handler は実行する（全部終わってから失敗を返す）

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::TodoEvent;
use crate::ports::{EventBus, EventHandler, PublishError};

type Subscribers = HashMap<&'static str, Vec<Arc<dyn EventHandler>>>;

#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event name (`TodoEvent::COMPLETED`, ...).
    pub fn subscribe(&self, event_name: &'static str, handler: Arc<dyn EventHandler>) {
        self.lock().entry(event_name).or_default().push(handler);
    }

    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.lock().get(event_name).map_or(0, Vec::len)
    }

    fn handlers_for(&self, event_name: &str) -> Vec<Arc<dyn EventHandler>> {
        self.lock().get(event_name).cloned().unwrap_or_default()
    }

    // subscriber lists stay valid even if a subscriber panicked mid-push
    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, events: Vec<TodoEvent>) -> Result<(), PublishError> {
        for event in &events {
            let handlers = self.handlers_for(event.name());
            if handlers.is_empty() {
                tracing::debug!(event_type = event.name(), "no subscribers");
                continue;
            }

            let mut failures = Vec::new();
            for handler in handlers {
                if let Err(e) = handler.handle(event).await {
                    failures.push(e.to_string());
                }
            }
            if !failures.is_empty() {
                return Err(PublishError::Handlers {
                    event_type: event.name(),
                    failures,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TodoId;
    use crate::ports::HandlerError;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        seen: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(&self, _event: &TodoEvent) -> Result<(), HandlerError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HandlerError::new("subscriber down"));
            }
            Ok(())
        }
    }

    fn completed() -> TodoEvent {
        TodoEvent::Completed {
            todo_id: TodoId::new("t1").unwrap(),
            occurred_on: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fan_out_by_event_name() {
        let bus = InMemoryEventBus::new();
        let on_completed = Counting::new(false);
        let on_deleted = Counting::new(false);
        bus.subscribe(TodoEvent::COMPLETED, on_completed.clone());
        bus.subscribe(TodoEvent::DELETED, on_deleted.clone());

        bus.publish(vec![completed()]).await.unwrap();

        assert_eq!(on_completed.seen.load(Ordering::SeqCst), 1);
        assert_eq!(on_deleted.seen.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(TodoEvent::COMPLETED), 1);
    }

    #[tokio::test]
    async fn one_failing_handler_does_not_skip_the_others() {
        let bus = InMemoryEventBus::new();
        let failing = Counting::new(true);
        let healthy = Counting::new(false);
        bus.subscribe(TodoEvent::COMPLETED, failing.clone());
        bus.subscribe(TodoEvent::COMPLETED, healthy.clone());

        let err = bus.publish(vec![completed()]).await.unwrap_err();

        assert!(matches!(err, PublishError::Handlers { ref failures, .. } if failures.len() == 1));
        assert_eq!(failing.seen.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_succeeds() {
        InMemoryEventBus::new().publish(vec![completed()]).await.unwrap();
    }
}
