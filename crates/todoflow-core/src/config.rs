//! Configuration loaded from environment variables with defaults.
//!
//! | variable | default |
//! |---|---|
//! | `TODOFLOW_LOG_LEVEL` | `info` |
//! | `TODOFLOW_LOG_TARGET` | `false` |
//! | `TODOFLOW_OUTBOX_BATCH_LIMIT` | `50` |
//! | `TODOFLOW_OUTBOX_POLL_INTERVAL_MS` | `1000` |
//! | `TODOFLOW_OUTBOX_MAX_RETRIES` | unset (retry forever) |
//! | `TODOFLOW_TITLE_POLICY` | `reject` (`return_existing`) |

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoflowConfig {
    pub log: LogConfig,
    pub outbox: OutboxConfig,
    pub title_policy: TitlePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `todoflow_core=debug`.
    pub level: String,
    /// Print the event target (module path) on each line.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Messages fetched per processor run.
    pub batch_limit: usize,
    /// Delay between runs of the background loop.
    pub poll_interval_ms: u64,
    /// Failed deliveries before a message is parked as FAILED. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl OutboxConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_limit: 50,
            poll_interval_ms: 1000,
            max_retries: None,
        }
    }
}

/// What `create` does when another todo already holds the (normalized) title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitlePolicy {
    /// Fail with a title conflict.
    #[default]
    Reject,
    /// Answer `already_exists` with the todo holding the title.
    ReturnExisting,
}

impl FromStr for TitlePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(TitlePolicy::Reject),
            "return_existing" => Ok(TitlePolicy::ReturnExisting),
            other => Err(format!("unknown title policy '{other}'")),
        }
    }
}

impl TodoflowConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary lookup (tests pass a map instead of touching the environment).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log: LogConfig {
                level: lookup("TODOFLOW_LOG_LEVEL")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or(defaults.log.level),
                with_target: parse_or(&lookup, "TODOFLOW_LOG_TARGET", defaults.log.with_target),
            },
            outbox: OutboxConfig {
                batch_limit: positive_or(
                    &lookup,
                    "TODOFLOW_OUTBOX_BATCH_LIMIT",
                    defaults.outbox.batch_limit,
                ),
                poll_interval_ms: positive_or(
                    &lookup,
                    "TODOFLOW_OUTBOX_POLL_INTERVAL_MS",
                    defaults.outbox.poll_interval_ms,
                ),
                max_retries: lookup("TODOFLOW_OUTBOX_MAX_RETRIES")
                    .and_then(|raw| parse_value("TODOFLOW_OUTBOX_MAX_RETRIES", &raw)),
            },
            title_policy: parse_or(&lookup, "TODOFLOW_TITLE_POLICY", defaults.title_policy),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|raw| parse_value(key, &raw))
        .unwrap_or(default)
}

/// Like `parse_or`, but zero also falls back to the default.
fn positive_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + From<u8>,
{
    match lookup(key).and_then(|raw| parse_value::<T>(key, &raw)) {
        Some(value) if value < T::from(1) => {
            tracing::warn!(key, "ignoring zero configuration value; it must be at least 1");
            default
        }
        Some(value) => value,
        None => default,
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "ignoring unparsable configuration value");
            None
        }
    }
}
