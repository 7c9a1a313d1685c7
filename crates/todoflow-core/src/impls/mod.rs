//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryKvStore**: 開発・テスト用のキーバリューストア
//! - **KvTodoRepository / KvOutboxRepository**: KeyValueStore 上の repository
//! - **KvUnitOfWork**: スナップショット / 復元によるトランザクション
//! - **OutboxEventBus / InMemoryEventBus**: 書き込み経路と配送経路の EventBus
//! - **RepositoryUniquenessChecker**: title index による一意性チェック
//! - **RecorderMetrics / InMemoryMetrics**
//!
//! 永続ストア（SQLite / Redis など）は KeyValueStore を実装すれば差し替えられます。

pub mod inmem_event_bus;
pub mod kv_outbox;
pub mod kv_todo_repository;
pub mod kv_unit_of_work;
pub mod memory_kv;
pub mod metrics;
pub mod outbox_event_bus;
pub mod uniqueness;

// 主要な型を再エクスポート
pub use self::inmem_event_bus::InMemoryEventBus;
pub use self::kv_outbox::KvOutboxRepository;
pub use self::kv_todo_repository::KvTodoRepository;
pub use self::kv_unit_of_work::KvUnitOfWork;
pub use self::memory_kv::InMemoryKvStore;
pub use self::metrics::{InMemoryMetrics, RecorderMetrics};
pub use self::outbox_event_bus::OutboxEventBus;
pub use self::uniqueness::RepositoryUniquenessChecker;
