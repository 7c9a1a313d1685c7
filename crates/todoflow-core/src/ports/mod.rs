//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait はストレージ、時刻、ID 採番、メトリクスなどの外部要素への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - キーバリューストアが source of truth（正本）
//! - イベントは outbox を経由して非同期に配送（at-least-once）

pub mod clock;
pub mod event_bus;
pub mod id_generator;
pub mod kv_store;
pub mod metrics;
pub mod outbox_repository;
pub mod todo_repository;
pub mod uniqueness;
pub mod unit_of_work;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_bus::{EventBus, EventHandler, HandlerError, PublishError};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::kv_store::{KeyScope, KeyValueStore, StorageError};
pub use self::metrics::{Metrics, Tags};
pub use self::outbox_repository::OutboxRepository;
pub use self::todo_repository::TodoRepository;
pub use self::uniqueness::{UniquenessChecker, UniquenessError};
pub use self::unit_of_work::UnitOfWork;
