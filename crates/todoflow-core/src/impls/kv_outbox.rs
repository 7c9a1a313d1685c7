//! KvOutboxRepository - KeyValueStore 上の outbox
//!
//! `outbox:<message id>` -> OutboxMessage (JSON)。
//! ステータスでの絞り込みと occurred_on 順の並べ替えは読み出し時に行います。

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{MessageId, OutboxMessage, OutboxStatus};
use crate::observability::OutboxCounts;
use crate::ports::{KeyValueStore, OutboxRepository, StorageError};

pub const OUTBOX_PREFIX: &str = "outbox:";

pub fn outbox_key(id: &MessageId) -> String {
    format!("{OUTBOX_PREFIX}{id}")
}

pub struct KvOutboxRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvOutboxRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load(&self, key: &str) -> Result<Option<OutboxMessage>, StorageError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Codec {
                key: key.to_string(),
                source,
            })
    }

    fn store_message(&self, message: &OutboxMessage) -> Result<(), StorageError> {
        let key = outbox_key(&message.id);
        let raw = serde_json::to_string(message).map_err(|source| StorageError::Codec {
            key: key.clone(),
            source,
        })?;
        self.store.set(&key, raw)
    }

    fn load_all(&self) -> Result<Vec<OutboxMessage>, StorageError> {
        let mut messages = Vec::new();
        for key in self.store.keys_with_prefix(OUTBOX_PREFIX)? {
            if let Some(message) = self.load(&key)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }
}

#[async_trait]
impl OutboxRepository for KvOutboxRepository {
    async fn add_many(&self, messages: Vec<OutboxMessage>) -> Result<(), StorageError> {
        for message in &messages {
            self.store_message(message)?;
        }
        Ok(())
    }

    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>, StorageError> {
        let mut pending: Vec<OutboxMessage> = self
            .load_all()?
            .into_iter()
            .filter(|m| m.status.is_deliverable())
            .collect();
        // same instant: order by message id so the batch is stable
        pending.sort_by(|a, b| a.occurred_on.cmp(&b.occurred_on).then(a.id.cmp(&b.id)));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_processed(&self, ids: &[MessageId]) -> Result<(), StorageError> {
        for id in ids {
            let Some(mut message) = self.load(&outbox_key(id))? else {
                tracing::warn!(message_id = %id, "cannot mark unknown outbox message as published");
                continue;
            };
            message.mark_published();
            self.store_message(&message)?;
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        id: &MessageId,
        error: &str,
        max_retries: Option<u32>,
    ) -> Result<OutboxStatus, StorageError> {
        let key = outbox_key(id);
        let mut message = self.load(&key)?.ok_or_else(|| StorageError::Corrupt {
            key: key.clone(),
            reason: "outbox message disappeared".to_string(),
        })?;
        let status = message.record_failure(error.to_string(), max_retries);
        self.store_message(&message)?;
        Ok(status)
    }

    async fn counts(&self) -> Result<OutboxCounts, StorageError> {
        let mut counts = OutboxCounts::default();
        for message in self.load_all()? {
            match message.status {
                OutboxStatus::Pending => counts.pending += 1,
                OutboxStatus::Published => counts.published += 1,
                OutboxStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}
