//! KvUnitOfWork - 書き込み前の値を記録して、失敗時に戻すトランザクション
//!
//! # 手順
//! 1. 書き込みを記録する JournaledStore を作り、それを使って Tx を組み立てる
//! 2. `work(tx)` を実行。各キーは最初の set / remove の直前に元の値を記録する
//! 3. Err なら、記録したキーのうちスコープ内のものだけを元の値に戻す
//!
//! 事前に全キーを読まないので、コストは Tx が書いたキー数にだけ比例します。
//! 触っていないキーは戻さないので、並行して走る outbox processor の
//! ステータス更新を巻き戻すことはありません。
//! スコープ外のキーへの書き込みは保護されません（警告ログのみ）。

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::ports::{KeyScope, KeyValueStore, StorageError, UnitOfWork};

type TxFactory<Tx> = dyn Fn(Arc<dyn KeyValueStore>) -> Tx + Send + Sync;

/// Value each key had before the transaction first wrote it (`None`: absent).
type PriorValues = BTreeMap<String, Option<String>>;

pub struct KvUnitOfWork<Tx> {
    store: Arc<dyn KeyValueStore>,
    scopes: Vec<KeyScope>,
    make_tx: Arc<TxFactory<Tx>>,
}

impl<Tx> KvUnitOfWork<Tx> {
    /// `make_tx` receives the store every transactional write must go through.
    pub fn new<F>(store: Arc<dyn KeyValueStore>, scopes: Vec<KeyScope>, make_tx: F) -> Self
    where
        F: Fn(Arc<dyn KeyValueStore>) -> Tx + Send + Sync + 'static,
    {
        Self {
            store,
            scopes,
            make_tx: Arc::new(make_tx),
        }
    }

    pub fn scopes(&self) -> &[KeyScope] {
        &self.scopes
    }

    fn in_scope(&self, key: &str) -> bool {
        self.scopes.iter().any(|s| s.covers(key))
    }

    /// Put back every touched, in-scope key. Keys that did not exist before
    /// the transaction are removed.
    fn restore(&self, prior: PriorValues) -> Result<usize, StorageError> {
        let mut restored = 0;
        for (key, value) in prior {
            if !self.in_scope(&key) {
                tracing::warn!(
                    key = %key,
                    "key written outside transaction scope was not rolled back"
                );
                continue;
            }
            match value {
                Some(value) => self.store.set(&key, value)?,
                None => self.store.remove(&key)?,
            }
            restored += 1;
        }
        Ok(restored)
    }
}

#[async_trait]
impl<Tx: Send + 'static> UnitOfWork for KvUnitOfWork<Tx> {
    type Tx = Tx;

    async fn transaction<T, E, F, Fut>(&self, work: F) -> Result<T, E>
    where
        T: Send,
        E: From<StorageError> + Send,
        F: FnOnce(Self::Tx) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        let journal = Arc::new(JournaledStore::new(Arc::clone(&self.store)));
        let tx = (self.make_tx)(journal.clone() as Arc<dyn KeyValueStore>);

        match work(tx).await {
            Ok(value) => Ok(value),
            Err(err) => {
                match self.restore(journal.take_prior()) {
                    Ok(restored) => tracing::debug!(restored, "transaction rolled back"),
                    // the work error wins over the restore error
                    Err(restore_err) => {
                        tracing::error!(
                            error = %restore_err,
                            "rollback failed; store may be inconsistent"
                        )
                    }
                }
                Err(err)
            }
        }
    }
}

/// Pass-through store that records the prior value of each key it writes.
struct JournaledStore {
    inner: Arc<dyn KeyValueStore>,
    prior: Mutex<PriorValues>,
}

impl JournaledStore {
    fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            prior: Mutex::new(BTreeMap::new()),
        }
    }

    /// Remember the current value the first time `key` is written.
    fn touch(&self, key: &str) -> Result<(), StorageError> {
        let mut prior = self.prior.lock().map_err(|_| StorageError::Poisoned)?;
        if !prior.contains_key(key) {
            let value = self.inner.get(key)?;
            prior.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn take_prior(&self) -> PriorValues {
        match self.prior.lock() {
            Ok(mut prior) => std::mem::take(&mut *prior),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl KeyValueStore for JournaledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.touch(key)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.touch(key)?;
        self.inner.remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.keys_with_prefix(prefix)
    }
}
