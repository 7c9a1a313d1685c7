//! EventBus port - ドメインイベントの発行
//!
//! # 実装
//! - **OutboxEventBus**: 書き込み経路。イベントを outbox に積むだけ
//! - **InMemoryEventBus**: 配送経路。購読者へ fan-out

use async_trait::async_trait;
use thiserror::Error;

use super::kv_store::StorageError;
use crate::domain::TodoEvent;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{} handler(s) failed for {event_type}: {}", .failures.len(), .failures.join("; "))]
    Handlers {
        event_type: &'static str,
        failures: Vec<String>,
    },

    #[error("failed to stage events: {0}")]
    Staging(#[from] StorageError),
}

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish in order. The events are consumed.
    async fn publish(&self, events: Vec<TodoEvent>) -> Result<(), PublishError>;
}

/// Subscriber of the in-memory bus.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &TodoEvent) -> Result<(), HandlerError>;
}
