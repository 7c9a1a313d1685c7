//! Todo aggregate - 状態と不変条件を持つ唯一の集約
//!
//! # 状態機械
//! - PENDING: title / description / labels を変更できる
//! - DONE: 構造的な変更は `DomainError::Immutable` で拒否
//!
//! # イベント
//! 状態が実際に変わったときだけ内部バッファに積みます。
//! `pull_domain_events` はバッファの所有権を返して空にします（二重発行防止）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::events::TodoEvent;
use super::ids::TodoId;
use super::label::Label;
use super::state::TodoStatus;
use super::title::TodoTitle;
use crate::ports::uniqueness::{UniquenessChecker, UniquenessError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    id: TodoId,
    title: TodoTitle,
    description: String,
    status: TodoStatus,
    labels: Vec<Label>,
    pending_events: Vec<TodoEvent>,
}

/// Persisted representation of a Todo (one record per id).
///
/// Value objects validate themselves again on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub id: TodoId,
    pub title: TodoTitle,
    #[serde(default)]
    pub description: String,
    pub status: TodoStatus,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Todo {
    /// Fresh todo: PENDING, no labels, no events.
    pub fn create(id: TodoId, title: TodoTitle, description: impl Into<String>) -> Self {
        Self {
            id,
            title,
            description: description.into(),
            status: TodoStatus::Pending,
            labels: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    /// Rebuild from persisted state. Never emits events.
    pub fn from_record(record: TodoRecord) -> Result<Self, DomainError> {
        let mut labels: Vec<Label> = Vec::with_capacity(record.labels.len());
        for label in record.labels {
            if labels.contains(&label) {
                return Err(DomainError::LabelAlreadyExists(label.to_string()));
            }
            labels.push(label);
        }

        Ok(Self {
            id: record.id,
            title: record.title,
            description: record.description,
            status: record.status,
            labels,
            pending_events: Vec::new(),
        })
    }

    pub fn to_record(&self) -> TodoRecord {
        TodoRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            labels: self.labels.clone(),
        }
    }

    pub fn id(&self) -> &TodoId {
        &self.id
    }

    pub fn title(&self) -> &TodoTitle {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> TodoStatus {
        self.status
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn is_done(&self) -> bool {
        self.status == TodoStatus::Done
    }

    /// PENDING -> DONE. Returns false (and records nothing) when already DONE.
    pub fn complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == TodoStatus::Done {
            return false;
        }
        self.status = TodoStatus::Done;
        self.pending_events.push(TodoEvent::Completed {
            todo_id: self.id.clone(),
            occurred_on: now,
        });
        true
    }

    /// DONE -> PENDING. Returns false (and records nothing) when already PENDING.
    pub fn reopen(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == TodoStatus::Pending {
            return false;
        }
        self.status = TodoStatus::Pending;
        self.pending_events.push(TodoEvent::Reopened {
            todo_id: self.id.clone(),
            occurred_on: now,
        });
        true
    }

    /// Change the title, consulting the uniqueness checker.
    ///
    /// An identical title is a no-op even on a DONE todo. A change that only
    /// differs in case or spacing keeps the same uniqueness key and skips the
    /// check, because the only holder of that key is this todo.
    pub async fn change_title(
        &mut self,
        new_title: TodoTitle,
        checker: &dyn UniquenessChecker,
    ) -> Result<bool, UniquenessError> {
        if new_title == self.title {
            return Ok(false);
        }
        self.ensure_mutable("change_title")?;

        if new_title.uniqueness_key() != self.title.uniqueness_key() {
            checker.ensure_unique(&new_title).await?;
        }
        self.title = new_title;
        Ok(true)
    }

    pub fn change_description(&mut self, new_description: &str) -> Result<bool, DomainError> {
        if new_description == self.description {
            return Ok(false);
        }
        self.ensure_mutable("change_description")?;
        self.description = new_description.to_string();
        Ok(true)
    }

    /// Returns false when an equal (normalized) label is already present.
    pub fn add_label(&mut self, label: Label) -> Result<bool, DomainError> {
        self.ensure_mutable("add_label")?;
        if self.labels.contains(&label) {
            return Ok(false);
        }
        self.labels.push(label);
        Ok(true)
    }

    /// Records `TodoDeleted`. Status is left untouched; the repository removes the row.
    pub fn delete(&mut self, now: DateTime<Utc>) {
        self.pending_events.push(TodoEvent::Deleted {
            todo_id: self.id.clone(),
            occurred_on: now,
        });
    }

    /// Drain recorded events in the order they were recorded.
    pub fn pull_domain_events(&mut self) -> Vec<TodoEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn ensure_mutable(&self, attempted: &'static str) -> Result<(), DomainError> {
        if self.status.is_mutable() {
            Ok(())
        } else {
            Err(DomainError::Immutable { attempted })
        }
    }
}
