//! Metrics implementations.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::ports::{Metrics, Tags};

/// Forwards to the `metrics` facade; whichever recorder is installed receives them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderMetrics;

fn to_labels(tags: Tags<'_>) -> Vec<::metrics::Label> {
    tags.iter()
        .map(|(k, v)| ::metrics::Label::new(*k, v.clone()))
        .collect()
}

impl Metrics for RecorderMetrics {
    fn increment(&self, name: &str, tags: Tags<'_>) {
        ::metrics::counter!(name.to_string(), to_labels(tags)).increment(1);
    }

    fn record_time(&self, name: &str, elapsed: Duration, tags: Tags<'_>) {
        ::metrics::histogram!(name.to_string(), to_labels(tags)).record(elapsed.as_secs_f64());
    }
}

/// Keeps everything in memory. Counters are keyed by name only.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<BTreeMap<String, u64>>,
    timings: Mutex<BTreeMap<String, Vec<Duration>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .map(|c| c.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn timing_count(&self, name: &str) -> usize {
        self.timings
            .lock()
            .map(|t| t.get(name).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Snapshot of all counters, ordered by name.
    pub fn counters(&self) -> BTreeMap<String, u64> {
        self.counters.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Metrics for InMemoryMetrics {
    fn increment(&self, name: &str, _tags: Tags<'_>) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    fn record_time(&self, name: &str, elapsed: Duration, _tags: Tags<'_>) {
        if let Ok(mut timings) = self.timings.lock() {
            timings.entry(name.to_string()).or_default().push(elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_counts_by_name() {
        let m = InMemoryMetrics::new();
        m.increment("complete_todo_success", &[("user_id", "u1".to_string())]);
        m.increment("complete_todo_success", &[]);
        m.record_time("complete_todo_duration_seconds", Duration::from_millis(3), &[]);

        assert_eq!(m.counter("complete_todo_success"), 2);
        assert_eq!(m.counter("never"), 0);
        assert_eq!(m.timing_count("complete_todo_duration_seconds"), 1);
        assert_eq!(m.counters().len(), 1);
    }

    #[test]
    fn recorder_metrics_without_recorder_is_a_noop() {
        let m = RecorderMetrics;
        m.increment("outbox_event_published", &[("event_type", "TodoCompleted".to_string())]);
        m.record_time("x_duration_seconds", Duration::from_millis(1), &[]);
    }
}
