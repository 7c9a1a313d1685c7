//! Use cases - 1 コマンド = 1 ファイル
//!
//! どの use case も同じ流れです:
//! 入力を値オブジェクトに変換 -> 集約をロード -> ドメイン操作を 1 つ適用
//! -> save -> イベントを pull して publish -> レスポンスに変換。
//! no-op（既に目的の状態）のときは save も publish もしません。

pub mod add_label;
pub mod complete_todo;
pub mod create_todo;
pub mod delete_todo;
pub mod list_todos;
pub mod reopen_todo;
pub mod update_content;

pub use self::add_label::{AddLabel, AddLabelInput, AddLabelResponse};
pub use self::complete_todo::{CompleteTodo, CompleteTodoInput, CompleteTodoResponse};
pub use self::create_todo::{CreateTodo, CreateTodoInput, CreateTodoResponse};
pub use self::delete_todo::{DeleteTodo, DeleteTodoInput, DeleteTodoResponse};
pub use self::list_todos::{ListTodos, ListTodosInput, ListTodosResponse};
pub use self::reopen_todo::{ReopenTodo, ReopenTodoInput, ReopenTodoResponse};
pub use self::update_content::{UpdateContent, UpdateContentInput, UpdateContentResponse};

use crate::app::context::TodoTx;
use crate::app::errors::{CommandError, Operation};
use crate::domain::{Todo, TodoId};

/// Load a todo or fail with a (non-idempotent) not-found.
async fn load_existing(
    tx: &TodoTx,
    id: &TodoId,
    operation: Operation,
) -> Result<Todo, CommandError> {
    tx.todos
        .get_by_id(id)
        .await?
        .ok_or_else(|| CommandError::not_found(id.clone(), operation))
}
