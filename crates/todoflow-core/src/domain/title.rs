//! TodoTitle value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::DomainError;

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 100;

/// Accented letters accepted in addition to ASCII letters, digits and whitespace.
const EXTRA_TITLE_CHARS: &str = "ñÑáéíóúÁÉÍÓÚ";

/// A validated, trimmed todo title.
///
/// Rules (checked in this order):
/// - not empty after trimming
/// - at most 100 characters
/// - at least 5 characters
/// - only letters, digits, whitespace and a few accented letters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TodoTitle(String);

impl TodoTitle {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let raw = raw.as_ref();
        let trimmed = raw.trim();
        let invalid = |reason: &str| DomainError::InvalidTitle {
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let len = trimmed.chars().count();
        if len == 0 {
            return Err(invalid("title cannot be empty"));
        }
        if len > TITLE_MAX_CHARS {
            return Err(invalid("title exceeds 100 characters"));
        }
        if len < TITLE_MIN_CHARS {
            return Err(invalid("title is too short, describe the task better"));
        }
        if !trimmed.chars().all(is_allowed_title_char) {
            return Err(invalid("title contains special characters"));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used by the uniqueness index: whitespace collapsed and lower-cased.
    pub fn uniqueness_key(&self) -> String {
        self.0
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

fn is_allowed_title_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || EXTRA_TITLE_CHARS.contains(c)
}

impl TryFrom<String> for TodoTitle {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TodoTitle> for String {
    fn from(title: TodoTitle) -> Self {
        title.0
    }
}

impl fmt::Display for TodoTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
