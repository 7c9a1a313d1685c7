//! Events - ドメインイベント
//!
//! Todo 集約が状態変化のたびに記録する、過去形の事実です。
//! 集約の内部バッファに積まれ、`pull_domain_events` で一度だけ取り出されます。
//!
//! # イベント種類
//! - TodoCompleted
//! - TodoReopened
//! - TodoDeleted
//!
//! 作成・タイトル変更・ラベル追加はイベントを発行しません。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TodoId;

/// TodoEvent は Todo 集約のドメインイベント
///
/// 閉じた列挙型なので、新しい種類を足すと match が全部コンパイルエラーになります。
/// outbox payload は `kind` タグ付きの JSON として保存されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TodoEvent {
    #[serde(rename = "TodoCompleted")]
    Completed {
        todo_id: TodoId,
        occurred_on: DateTime<Utc>,
    },
    #[serde(rename = "TodoReopened")]
    Reopened {
        todo_id: TodoId,
        occurred_on: DateTime<Utc>,
    },
    #[serde(rename = "TodoDeleted")]
    Deleted {
        todo_id: TodoId,
        occurred_on: DateTime<Utc>,
    },
}

impl TodoEvent {
    pub const COMPLETED: &'static str = "TodoCompleted";
    pub const REOPENED: &'static str = "TodoReopened";
    pub const DELETED: &'static str = "TodoDeleted";

    /// Stable event name, also used as the outbox `event_type`.
    pub fn name(&self) -> &'static str {
        match self {
            TodoEvent::Completed { .. } => Self::COMPLETED,
            TodoEvent::Reopened { .. } => Self::REOPENED,
            TodoEvent::Deleted { .. } => Self::DELETED,
        }
    }

    pub fn aggregate_id(&self) -> &TodoId {
        match self {
            TodoEvent::Completed { todo_id, .. }
            | TodoEvent::Reopened { todo_id, .. }
            | TodoEvent::Deleted { todo_id, .. } => todo_id,
        }
    }

    pub fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            TodoEvent::Completed { occurred_on, .. }
            | TodoEvent::Reopened { occurred_on, .. }
            | TodoEvent::Deleted { occurred_on, .. } => *occurred_on,
        }
    }
}
