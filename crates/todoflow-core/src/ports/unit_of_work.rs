//! UnitOfWork port - トランザクション境界
//!
//! `transaction` は呼び出しごとに新しい Tx（repository + event bus の束）を作り、
//! `work` が Err を返したらスナップショットへ巻き戻してから同じ Err を返します。
//! ネストは未対応です。

use async_trait::async_trait;
use std::future::Future;

use super::kv_store::StorageError;

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Transaction context handed to `work`. Never reused across calls.
    type Tx: Send;

    async fn transaction<T, E, F, Fut>(&self, work: F) -> Result<T, E>
    where
        T: Send,
        E: From<StorageError> + Send,
        F: FnOnce(Self::Tx) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send;
}
