//! Observability - ログ初期化と状態ビュー

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Outbox messages by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxCounts {
    pub pending: usize,
    pub published: usize,
    pub failed: usize,
}

impl OutboxCounts {
    pub fn total(&self) -> usize {
        self.pending + self.published + self.failed
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `config.level` when set. Returns false when a
/// subscriber was already installed (the call is then a no-op).
pub fn init_tracing(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
        .try_init()
        .is_ok()
}
