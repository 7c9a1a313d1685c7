//! InMemoryKvStore - 開発・テスト用のキーバリューストア
//!
//! # 実装詳細
//! - BTreeMap で保持（prefix 走査がキー順になる）
//! - Mutex で排他制御。lock を保持したまま await しない（trait が同期なので自然にそうなる）
//! - clone すると同じキー空間を共有する

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ports::{KeyValueStore, StorageError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryKvStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, for assertions and debugging.
    pub fn dump(&self) -> Result<BTreeMap<String, String>, StorageError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let entries = self.lock()?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
