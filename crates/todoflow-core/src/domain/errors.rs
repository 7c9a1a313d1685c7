//! Errors - ドメインエラー
//!
//! 値オブジェクトと集約が検出するルール違反です。
//! アプリケーション層への分類（Validation / Conflict など）は `app::errors` が一箇所で行います。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid todo id '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    #[error("invalid todo title '{value}': {reason}")]
    InvalidTitle { value: String, reason: String },

    #[error("invalid label '{value}': {reason}")]
    InvalidLabel { value: String, reason: String },

    #[error("label '{0}' already exists on this todo")]
    LabelAlreadyExists(String),

    #[error("a todo with title \"{0}\" already exists")]
    TitleAlreadyExists(String),

    /// Structural mutation attempted while the todo is DONE.
    #[error("todo is completed and cannot be modified (attempted: {attempted})")]
    Immutable { attempted: &'static str },
}
