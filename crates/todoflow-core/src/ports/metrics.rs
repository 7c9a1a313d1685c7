//! Metrics port - カウンタと所要時間
//!
//! # 実装
//! - **RecorderMetrics**: `metrics` crate の facade へ転送
//! - **InMemoryMetrics**: テスト / デモ用

use std::time::Duration;

/// Tag list attached to a metric.
pub type Tags<'a> = &'a [(&'static str, String)];

pub trait Metrics: Send + Sync {
    fn increment(&self, name: &str, tags: Tags<'_>);

    fn record_time(&self, name: &str, elapsed: Duration, tags: Tags<'_>);
}
