//! todoflow-core
//!
//! Todo タスク管理のコア: 集約、永続化、トランザクション、outbox 配送。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Todo 集約、値オブジェクト、イベント、outbox メッセージ、権限）
//! - **ports**: 抽象化レイヤー（KeyValueStore, TodoRepository, OutboxRepository, EventBus, UnitOfWork, など）
//! - **impls**: 実装（インメモリ KV、KV ベースの repository / outbox、UnitOfWork、event bus）
//! - **app**: アプリケーションロジック（use case、middleware、pipeline、outbox processor、builder）
//! - **config**: 環境変数からの設定
//! - **observability**: tracing の初期化と outbox の集計ビュー

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
