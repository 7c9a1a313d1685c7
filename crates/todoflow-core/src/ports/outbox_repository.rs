//! OutboxRepository port - outbox テーブルの抽象化

use async_trait::async_trait;

use super::kv_store::StorageError;
use crate::domain::{MessageId, OutboxMessage, OutboxStatus};
use crate::observability::OutboxCounts;

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    async fn add_many(&self, messages: Vec<OutboxMessage>) -> Result<(), StorageError>;

    /// Up to `limit` PENDING messages, oldest `occurred_on` first.
    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<OutboxMessage>, StorageError>;

    /// Mark delivered messages as PUBLISHED in one batch. Unknown ids are skipped.
    async fn mark_processed(&self, ids: &[MessageId]) -> Result<(), StorageError>;

    /// Count a failed delivery and return the resulting status.
    async fn record_failure(
        &self,
        id: &MessageId,
        error: &str,
        max_retries: Option<u32>,
    ) -> Result<OutboxStatus, StorageError>;

    async fn counts(&self) -> Result<OutboxCounts, StorageError>;
}
