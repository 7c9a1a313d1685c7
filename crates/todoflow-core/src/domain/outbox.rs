//! Outbox message: a domain event staged for later delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::TodoEvent;
use super::ids::{MessageId, TodoId};

/// Outbox message status.
///
/// State transitions:
/// - Pending -> Published (delivered)
/// - Pending -> Pending (delivery failed, retries += 1)
/// - Pending -> Failed (only when a retry limit is configured and reached)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    #[default]
    Pending,
    Published,
    Failed,
}

impl OutboxStatus {
    /// Eligible for the processor to pick up?
    pub fn is_deliverable(self) -> bool {
        matches!(self, OutboxStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: MessageId,
    /// Event name, e.g. `TodoCompleted`.
    pub event_type: String,
    pub occurred_on: DateTime<Utc>,
    /// Full event serialized as JSON.
    pub payload: String,
    pub aggregate_id: Option<TodoId>,
    pub status: OutboxStatus,
    pub retries: u32,
    /// Last delivery error (if any).
    #[serde(default)]
    pub last_error: Option<String>,
}

impl OutboxMessage {
    /// Stage an event: PENDING, zero retries.
    pub fn from_event(id: MessageId, event: &TodoEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id,
            event_type: event.name().to_string(),
            occurred_on: event.occurred_on(),
            payload: serde_json::to_string(event)?,
            aggregate_id: Some(event.aggregate_id().clone()),
            status: OutboxStatus::Pending,
            retries: 0,
            last_error: None,
        })
    }

    pub fn decode_event(&self) -> Result<TodoEvent, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }

    pub fn mark_published(&mut self) {
        self.status = OutboxStatus::Published;
    }

    /// Count a failed delivery. Moves to FAILED once `max_retries` is reached.
    pub fn record_failure(&mut self, error: String, max_retries: Option<u32>) -> OutboxStatus {
        self.retries = self.retries.saturating_add(1);
        self.last_error = Some(error);
        if let Some(max) = max_retries
            && self.retries >= max
        {
            self.status = OutboxStatus::Failed;
        }
        self.status
    }
}
