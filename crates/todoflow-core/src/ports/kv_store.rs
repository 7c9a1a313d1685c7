//! KeyValueStore port - ストレージの抽象化
//!
//! Repository / Outbox / UnitOfWork はすべてこの trait 越しにキー空間を触ります。
//! ネイティブなトランザクションを持たないストアでも使えるよう、
//! 操作は get / set / remove / prefix 走査だけに絞っています。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage lock poisoned")]
    Poisoned,

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to encode/decode record '{key}': {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt record '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

/// Synchronous string key/value store.
///
/// # Thread Safety
/// - `Send + Sync` を要求（Arc で共有される）
/// - 各操作は単体で原子的であればよい（複数キーの原子性は UnitOfWork が担う）
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// A set of keys protected by a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyScope {
    Exact(String),
    /// Every key under the prefix, including keys created during the transaction.
    Prefix(String),
}

impl KeyScope {
    pub fn exact(key: impl Into<String>) -> Self {
        KeyScope::Exact(key.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        KeyScope::Prefix(prefix.into())
    }

    pub fn covers(&self, key: &str) -> bool {
        match self {
            KeyScope::Exact(k) => k == key,
            KeyScope::Prefix(p) => key.starts_with(p.as_str()),
        }
    }
}
