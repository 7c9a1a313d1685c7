//! App - アプリケーション層
//!
//! ports を組み合わせて、コマンドごとのパイプラインと outbox 配送を組み立てます。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: ワイヤリングと各コマンドの Pipeline
//! - **Pipeline / Middleware**: permission -> observability -> transactional -> use case
//! - **use_cases**: 1 コマンド = 1 handler
//! - **OutboxProcessor**: outbox の PENDING を購読者へ配送（at-least-once）
//! - **errors**: CommandError と、外向きの AppError への分類

pub mod builder;
pub mod context;
pub mod dto;
pub mod errors;
pub mod middleware;
pub mod outbox_processor;
pub mod pipeline;
pub mod use_cases;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::context::{TodoTx, TodoUnitOfWork, todo_scopes, todo_unit_of_work};
pub use self::dto::TodoDto;
pub use self::errors::{
    AppError, Classification, CommandError, ErrorKind, Operation, Outcome, Swallowable, classify,
    map_error,
};
pub use self::middleware::{ObservabilityMiddleware, PermissionMiddleware, Transactional};
pub use self::outbox_processor::{OutboxLoop, OutboxProcessor, ProcessReport};
pub use self::pipeline::{Handler, Middleware, Next, Pipeline};
