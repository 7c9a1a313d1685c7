//! State - Todo の完了状態
//!
//! # 状態遷移
//! - PENDING --complete--> DONE
//! - DONE --reopen--> PENDING
//!
//! 同じ状態への遷移は no-op（イベントなし）。

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TodoStatus {
    #[default]
    Pending,
    Done,
}

impl TodoStatus {
    /// Title, description and labels may only change while pending.
    pub fn is_mutable(self) -> bool {
        matches!(self, TodoStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TodoStatus::Pending => "PENDING",
            TodoStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
