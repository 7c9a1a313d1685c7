//! Errors - アプリケーション層のエラー
//!
//! # 2 段構成
//! - **CommandError**: パイプラインの各層がそのまま返すエラー（元の型を保持）
//! - **AppError**: 外向きの統一形。`map_error` だけが CommandError から作る
//!
//! 分類（kind / code / outcome / swallow / retriable）は `classify` の一箇所で決まり、
//! observability middleware もパイプラインの出口も同じ結果を使います。

use std::fmt;
use thiserror::Error;

use crate::domain::{DomainError, PermissionDenied, TodoId};
use crate::ports::{PublishError, StorageError, UniquenessError};

/// Command names, used for log fields and metric names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateTodo,
    CompleteTodo,
    ReopenTodo,
    AddLabel,
    UpdateContent,
    DeleteTodo,
    ListTodos,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::CreateTodo => "create_todo",
            Operation::CompleteTodo => "complete_todo",
            Operation::ReopenTodo => "reopen_todo",
            Operation::AddLabel => "add_label",
            Operation::UpdateContent => "update_content",
            Operation::DeleteTodo => "delete_todo",
            Operation::ListTodos => "list_todos",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// `idempotent` is set by use cases that treat a missing todo as "already done".
    #[error("todo '{id}' not found ({operation})")]
    NotFound {
        id: TodoId,
        operation: Operation,
        idempotent: bool,
    },

    #[error(transparent)]
    Forbidden(#[from] PermissionDenied),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl CommandError {
    pub fn not_found(id: TodoId, operation: Operation) -> Self {
        CommandError::NotFound {
            id,
            operation,
            idempotent: false,
        }
    }

    /// Missing todo that the caller should see as a successful no-op.
    pub fn already_gone(id: TodoId, operation: Operation) -> Self {
        CommandError::NotFound {
            id,
            operation,
            idempotent: true,
        }
    }
}

impl From<UniquenessError> for CommandError {
    fn from(err: UniquenessError) -> Self {
        match err {
            UniquenessError::Domain(e) => CommandError::Domain(e),
            UniquenessError::Storage(e) => CommandError::Storage(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    Unexpected,
}

impl ErrorKind {
    /// HTTP-like status class for outward adapters.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unexpected => 500,
        }
    }
}

/// Outcome class, used in metric names (`<operation>_<outcome>`) and log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Validation,
    NotFound,
    Forbidden,
    Failure,
    Duplicate,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Validation => "validation",
            Outcome::NotFound => "not_found",
            Outcome::Forbidden => "forbidden",
            Outcome::Failure => "failure",
            Outcome::Duplicate => "duplicate",
        }
    }

    /// Caller mistakes are logged at warn, everything else at error.
    pub fn is_client_error(self) -> bool {
        matches!(self, Outcome::Validation | Outcome::NotFound | Outcome::Forbidden)
    }
}

/// Classification of one CommandError.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub outcome: Outcome,
    pub swallow: bool,
    pub retriable: bool,
}

pub fn classify(err: &CommandError) -> Classification {
    let c = |kind, code, outcome| Classification {
        kind,
        code,
        outcome,
        swallow: false,
        retriable: false,
    };

    match err {
        CommandError::Domain(domain) => match domain {
            DomainError::InvalidTitle { .. } => {
                c(ErrorKind::Validation, "TODO_TITLE_INVALID", Outcome::Validation)
            }
            DomainError::InvalidId { .. } => {
                c(ErrorKind::Validation, "TODO_ID_INVALID", Outcome::Validation)
            }
            DomainError::InvalidLabel { .. } => {
                c(ErrorKind::Validation, "TODO_LABEL_INVALID", Outcome::Validation)
            }
            DomainError::LabelAlreadyExists(_) => Classification {
                swallow: true,
                ..c(ErrorKind::Conflict, "LABEL_ALREADY_EXISTS", Outcome::Duplicate)
            },
            DomainError::TitleAlreadyExists(_) => {
                c(ErrorKind::Conflict, "TODO_TITLE_ALREADY_EXISTS", Outcome::Duplicate)
            }
            DomainError::Immutable { .. } => {
                c(ErrorKind::Conflict, "TODO_IMMUTABLE", Outcome::Failure)
            }
        },
        CommandError::NotFound { idempotent, .. } => Classification {
            swallow: *idempotent,
            ..c(ErrorKind::NotFound, "TODO_NOT_FOUND", Outcome::NotFound)
        },
        CommandError::Forbidden(_) => c(ErrorKind::Forbidden, "FORBIDDEN", Outcome::Forbidden),
        CommandError::Storage(_) => Classification {
            retriable: true,
            ..c(ErrorKind::Unexpected, "STORAGE_FAILURE", Outcome::Failure)
        },
        CommandError::Publish(_) => Classification {
            retriable: true,
            ..c(ErrorKind::Unexpected, "EVENT_PUBLISH_FAILED", Outcome::Failure)
        },
    }
}

/// Uniform application error returned by `Pipeline::execute`.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
    pub outcome: Outcome,
    pub swallow: bool,
    pub retriable: bool,
    #[source]
    pub source: CommandError,
}

impl AppError {
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }
}

pub fn map_error(err: CommandError) -> AppError {
    let Classification {
        kind,
        code,
        outcome,
        swallow,
        retriable,
    } = classify(&err);

    AppError {
        kind,
        code,
        message: err.to_string(),
        outcome,
        swallow,
        retriable,
        source: err,
    }
}

impl From<CommandError> for AppError {
    fn from(err: CommandError) -> Self {
        map_error(err)
    }
}

/// Outputs that can turn a swallowed error into a no-op success.
pub trait Swallowable: Sized {
    fn from_swallowed(_err: &CommandError) -> Option<Self> {
        None
    }
}
