//! OutboxEventBus - 書き込み経路の EventBus
//!
//! publish はイベントを OutboxMessage に変換して outbox に積むだけです。
//! 同じ Tx の store を使うので、集約の save と同じトランザクションに乗ります。

use async_trait::async_trait;
use std::sync::Arc;

use super::kv_outbox::outbox_key;
use crate::domain::{OutboxMessage, TodoEvent};
use crate::ports::{EventBus, IdGenerator, OutboxRepository, PublishError, StorageError};

pub struct OutboxEventBus {
    outbox: Arc<dyn OutboxRepository>,
    ids: Arc<dyn IdGenerator>,
}

impl OutboxEventBus {
    pub fn new(outbox: Arc<dyn OutboxRepository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { outbox, ids }
    }
}

#[async_trait]
impl EventBus for OutboxEventBus {
    async fn publish(&self, events: Vec<TodoEvent>) -> Result<(), PublishError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut messages = Vec::with_capacity(events.len());
        for event in &events {
            let id = self.ids.generate_message_id();
            let message =
                OutboxMessage::from_event(id, event).map_err(|source| StorageError::Codec {
                    key: outbox_key(&id),
                    source,
                })?;
            tracing::debug!(message_id = %id, event_type = event.name(), "event staged in outbox");
            messages.push(message);
        }
        self.outbox.add_many(messages).await?;
        Ok(())
    }
}
