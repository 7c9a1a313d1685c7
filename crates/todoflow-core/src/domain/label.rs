//! Label value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::DomainError;

pub const LABEL_MIN_CHARS: usize = 2;

/// A normalized label: trimmed, inner whitespace collapsed, lower-cased.
///
/// Two labels are equal when their normalized values are equal, so
/// `"  Urgent "` and `"URGENT"` are the same label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let raw = raw.as_ref();
        let normalized = normalize(raw);
        if normalized.chars().count() < LABEL_MIN_CHARS {
            return Err(DomainError::InvalidLabel {
                value: raw.to_string(),
                reason: "label is too short".to_string(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl TryFrom<String> for Label {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
